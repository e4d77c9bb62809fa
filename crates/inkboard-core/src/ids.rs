//! Object identity allocation.
//!
//! Every drawn item is keyed by an [`ObjectId`], the pair of the user that
//! created it and a local id taken from a counter shared by all users of the
//! session. Local ids are never handed out twice by the same allocator, even
//! after the item they named has been undone away.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Composite identifier of a drawn item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub user_id: i64,
    pub local_id: u64,
}

impl ObjectId {
    /// Placeholder owner for items that haven't been given an id yet.
    pub const UNASSIGNED_USER: i64 = -1;

    /// Id from explicit parts, e.g. one received from a remote user.
    pub const fn new(user_id: i64, local_id: u64) -> Self {
        Self { user_id, local_id }
    }

    /// Whether this id came from an allocator.
    pub fn is_assigned(&self) -> bool {
        self.user_id != Self::UNASSIGNED_USER
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new(Self::UNASSIGNED_USER, 0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.local_id)
    }
}

/// Issues [`ObjectId`]s from a single monotonically increasing counter.
///
/// Safe to share between the gesture thread and the network thread.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first local id is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose first local id is `next`.
    pub fn starting_at(next: u64) -> Self {
        Self {
            next: AtomicU64::new(next),
        }
    }

    /// Allocate a fresh id for `user_id`.
    pub fn allocate(&self, user_id: i64) -> ObjectId {
        let local_id = self.next.fetch_add(1, Ordering::SeqCst);
        ObjectId::new(user_id, local_id)
    }

    /// The local id the next call to [`allocate`](Self::allocate) would return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Move the counter past an id seen from elsewhere (e.g. a loaded
    /// document), so later local ids sort after it. Never moves backwards.
    pub fn observe(&self, id: ObjectId) {
        self.next
            .fetch_max(id.local_id.saturating_add(1), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn test_counter_shared_across_users() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.allocate(7), ObjectId::new(7, 0));
        assert_eq!(alloc.allocate(3), ObjectId::new(3, 1));
        assert_eq!(alloc.allocate(7), ObjectId::new(7, 2));
        assert_eq!(alloc.peek(), 3);
    }

    #[test]
    fn test_allocators_are_independent() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        a.allocate(1);
        a.allocate(1);
        assert_eq!(b.allocate(1).local_id, 0);
    }

    #[test]
    fn test_observe_only_moves_forward() {
        let alloc = IdAllocator::starting_at(10);
        alloc.observe(ObjectId::new(2, 4));
        assert_eq!(alloc.peek(), 10);
        alloc.observe(ObjectId::new(2, 41));
        assert_eq!(alloc.allocate(0).local_id, 42);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let alloc = Arc::new(IdAllocator::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|user| {
                let alloc = Arc::clone(&alloc);
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    let mut local = Vec::with_capacity(500);
                    for _ in 0..500 {
                        local.push(alloc.allocate(user));
                    }
                    // Each thread observes its own ids in increasing order.
                    assert!(local.windows(2).all(|w| w[0].local_id < w[1].local_id));
                    seen.lock().unwrap().extend(local);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        let unique: HashSet<u64> = seen.iter().map(|id| id.local_id).collect();
        assert_eq!(seen.len(), 4000);
        assert_eq!(unique.len(), 4000);
        assert_eq!(alloc.peek(), 4000);
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectId::new(3, 17).to_string(), "3:17");
        assert!(!ObjectId::default().is_assigned());
    }
}
