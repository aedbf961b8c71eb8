//! Bounded undo history

use crate::MapSnapshot;
use std::collections::VecDeque;

/// Maximum number of snapshots kept for undo
pub const HISTORY_LIMIT: usize = 100;

/// Stack of pre-mutation snapshots. Pushing past the capacity evicts the
/// oldest entry; undo pops the newest.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<MapSnapshot>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_LIMIT)),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: MapSnapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Remove and return the most recent snapshot
    pub fn pop(&mut self) -> Option<MapSnapshot> {
        self.entries.pop_back()
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grid, Location};

    fn snapshot(size: usize) -> MapSnapshot {
        MapSnapshot::new(Grid::new(size), Location::default())
    }

    #[test]
    fn test_push_pop_order() {
        let mut log = HistoryLog::default();
        log.push(snapshot(3));
        log.push(snapshot(4));
        assert_eq!(log.pop().map(|s| s.grid_size()), Some(4));
        assert_eq!(log.pop().map(|s| s.grid_size()), Some(3));
        assert!(log.pop().is_none());
        assert!(!log.can_undo());
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut log = HistoryLog::with_capacity(2);
        log.push(snapshot(3));
        log.push(snapshot(4));
        log.push(snapshot(5));
        assert_eq!(log.len(), 2);
        assert_eq!(log.pop().map(|s| s.grid_size()), Some(5));
        assert_eq!(log.pop().map(|s| s.grid_size()), Some(4));
    }
}
