//! Byte-level edits of a queue record
//!
//! The record is written by hand, so saving must not reformat it. Instead of
//! re-serializing, the store finds the byte spans of each item's members and
//! replaces only the values it changes. Everything else, including
//! indentation, string escapes and repeated keys, is copied through as-is.
//!
//! The scanner assumes its input has already been accepted by `serde_json`.
//! It tracks structure only and never decodes values, except for member keys.

use std::ops::Range;

/// One `"key": value` member of an item object
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Member {
    /// Whitespace between the preceding `{` or `,` and the key
    pub lead: Range<usize>,
    /// Key including its quotes
    pub key: Range<usize>,
    /// Everything between the key and the value, normally `: `
    pub separator: Range<usize>,
    pub value: Range<usize>,
}

/// Spans of the members the store edits, for one item.
///
/// When a key repeats, the last occurrence is kept: that is the one
/// `serde_json` reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EntrySpans {
    pub posted: Option<Member>,
    pub post_date: Option<Member>,
}

/// A pending replacement of `range` with `text`
#[derive(Debug, Clone)]
pub(crate) struct Replacement {
    pub range: Range<usize>,
    pub text: String,
}

/// Locate the item objects of a record, in persisted order
pub(crate) fn entry_spans(raw: &str) -> Result<Vec<EntrySpans>, String> {
    let mut scanner = Scanner::new(raw);
    scanner.skip_ws();

    let entries = match scanner.peek() {
        Some(b'[') => scanner.item_array()?,
        Some(b'{') => {
            let mut found = None;
            scanner.object(|scanner, key| {
                if key == "items" {
                    found = Some(scanner.item_array()?);
                } else {
                    scanner.skip_value()?;
                }
                Ok(())
            })?;
            found.ok_or_else(|| "no `items` array".to_string())?
        }
        _ => return Err("expected an array or object at the root".to_string()),
    };

    Ok(entries)
}

/// Replacements that mark an entry as posted at `date` (an RFC 3339 string)
pub(crate) fn mark_posted_edits(
    raw: &str,
    entry: &EntrySpans,
    date: &str,
) -> Result<Vec<Replacement>, String> {
    let posted = entry.posted.as_ref().ok_or("entry has no `posted` key")?;
    let date = serde_json::to_string(date).map_err(|e| e.to_string())?;

    let mut edits = vec![Replacement {
        range: posted.value.clone(),
        text: "true".to_string(),
    }];

    match &entry.post_date {
        Some(post_date) => edits.push(Replacement {
            range: post_date.value.clone(),
            text: date,
        }),
        // New member goes right after `posted`, laid out the same way
        None => edits.push(Replacement {
            range: posted.value.end..posted.value.end,
            text: format!(
                ",{}\"post_date\"{}{}",
                &raw[posted.lead.clone()],
                &raw[posted.separator.clone()],
                date
            ),
        }),
    }

    Ok(edits)
}

/// Replacements that return an entry to the unposted state.
///
/// `post_date` becomes `null` when present and is never added.
pub(crate) fn reset_edits(entry: &EntrySpans) -> Result<Vec<Replacement>, String> {
    let posted = entry.posted.as_ref().ok_or("entry has no `posted` key")?;

    let mut edits = vec![Replacement {
        range: posted.value.clone(),
        text: "false".to_string(),
    }];
    if let Some(post_date) = &entry.post_date {
        edits.push(Replacement {
            range: post_date.value.clone(),
            text: "null".to_string(),
        });
    }

    Ok(edits)
}

/// Apply replacements from the end of the text backwards so earlier byte
/// positions stay valid
pub(crate) fn apply(raw: &str, mut edits: Vec<Replacement>) -> String {
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut result = raw.to_string();
    for edit in edits {
        result.replace_range(edit.range, &edit.text);
    }
    result
}

struct Scanner<'a> {
    raw: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            bytes: raw.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), String> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!(
                "expected '{}' at byte {}",
                char::from(byte),
                self.pos
            ))
        }
    }

    fn skip_string(&mut self) -> Result<(), String> {
        let start = self.pos;
        self.expect(b'"')?;
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'"' => return Ok(()),
                _ => {}
            }
        }
        Err(format!("unterminated string at byte {}", start))
    }

    fn skip_value(&mut self) -> Result<(), String> {
        match self.peek() {
            Some(b'"') => self.skip_string(),
            Some(b'{') => self.object(|scanner, _| scanner.skip_value()),
            Some(b'[') => self.array(|scanner| scanner.skip_value()),
            Some(_) => {
                // Number or literal
                while !matches!(
                    self.peek(),
                    None | Some(b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')
                ) {
                    self.pos += 1;
                }
                Ok(())
            }
            None => Err("unexpected end of record".to_string()),
        }
    }

    /// Walk an object, handing each decoded key to `member` with the scanner
    /// positioned at the start of its value
    fn object<F>(&mut self, mut member: F) -> Result<(), String>
    where
        F: FnMut(&mut Self, &str) -> Result<(), String>,
    {
        self.members(|scanner, key, _| member(scanner, key))
    }

    fn members<F>(&mut self, mut member: F) -> Result<(), String>
    where
        F: FnMut(&mut Self, &str, MemberStart) -> Result<(), String>,
    {
        self.expect(b'{')?;
        let mut lead_start = self.pos;
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_ws();
            let key_start = self.pos;
            self.skip_string()?;
            let key_end = self.pos;
            let key: String = serde_json::from_str(&self.raw[key_start..key_end])
                .map_err(|e| format!("bad key at byte {}: {}", key_start, e))?;

            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();

            let start = MemberStart {
                lead: lead_start..key_start,
                key: key_start..key_end,
                value_start: self.pos,
            };
            member(self, &key, start)?;

            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    lead_start = self.pos;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(format!("expected ',' or '}}' at byte {}", self.pos)),
            }
        }
    }

    fn array<F>(&mut self, mut element: F) -> Result<(), String>
    where
        F: FnMut(&mut Self) -> Result<(), String>,
    {
        self.expect(b'[')?;
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_ws();
            element(self)?;
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(format!("expected ',' or ']' at byte {}", self.pos)),
            }
        }
    }

    fn item_array(&mut self) -> Result<Vec<EntrySpans>, String> {
        let mut entries = Vec::new();
        self.array(|scanner| {
            entries.push(scanner.entry()?);
            Ok(())
        })?;
        Ok(entries)
    }

    fn entry(&mut self) -> Result<EntrySpans, String> {
        if self.peek() != Some(b'{') {
            return Err(format!("expected an object at byte {}", self.pos));
        }

        let mut spans = EntrySpans::default();
        self.members(|scanner, key, start| {
            scanner.skip_value()?;
            let member = Member {
                lead: start.lead,
                separator: start.key.end..start.value_start,
                key: start.key,
                value: start.value_start..scanner.pos,
            };
            match key {
                "posted" => spans.posted = Some(member),
                "post_date" => spans.post_date = Some(member),
                _ => {}
            }
            Ok(())
        })?;
        Ok(spans)
    }
}

/// Where a member begins, before its value is scanned
struct MemberStart {
    lead: Range<usize>,
    key: Range<usize>,
    value_start: usize,
}
