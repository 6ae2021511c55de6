//! Choosing the next clip to post

use crate::store::Queue;
use crate::types::Item;

/// First item in persisted order that has not been posted.
///
/// The queue is never re-sorted; ids play no part in the choice. `None`
/// means everything has been posted.
pub fn select_next(queue: &Queue) -> Option<&Item> {
    queue.items().iter().find(|item| !item.posted)
}
