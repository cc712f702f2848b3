// ============================================================================
// UNDO HISTORY - fixed-capacity ring of immutable snapshots
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;

/// Default undo depth for the interactive editors.
pub const DEFAULT_UNDO_DEPTH: usize = 10;

/// Bounded undo stack. Pushing beyond capacity evicts the oldest entry;
/// `undo` returns the newest.
#[derive(Debug, Clone)]
pub struct SnapshotRing<T> {
    entries: VecDeque<Arc<T>>,
    capacity: usize,
}

pub type ImageHistory = SnapshotRing<RgbaImage>;

impl<T> Default for SnapshotRing<T> {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl<T> SnapshotRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: impl Into<Arc<T>>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot.into());
    }

    pub fn undo(&mut self) -> Option<Arc<T>> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&Arc<T>> {
        self.entries.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut ring: SnapshotRing<u32> = SnapshotRing::new(3);
        for v in 1..=5 {
            ring.push(v);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(*ring.undo().unwrap(), 5);
        assert_eq!(*ring.undo().unwrap(), 4);
        assert_eq!(*ring.undo().unwrap(), 3);
        assert!(ring.undo().is_none());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut ring: SnapshotRing<u8> = SnapshotRing::new(0);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(*ring.peek().unwrap().as_ref(), 2);
    }

    #[test]
    fn default_depth_is_ten() {
        let ring: ImageHistory = SnapshotRing::default();
        assert_eq!(ring.capacity(), DEFAULT_UNDO_DEPTH);
        assert!(!ring.can_undo());
    }
}
