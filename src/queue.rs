//! Extremal priority queue over person balances.

use crate::amount::Amount;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Which extreme a [`BalanceQueue`] yields first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Largest balance first (creditors).
    Max,
    /// Smallest balance first (debtors).
    Min,
}

impl Orientation {
    /// Maps a balance to the heap key, and back again (the mapping is its own inverse).
    fn key(self, balance: Amount) -> Amount {
        match self {
            Orientation::Max => balance,
            Orientation::Min => -balance,
        }
    }
}

/// Binary heap of `(person, balance)` entries.
///
/// Entries with equal balances come out in ascending name order regardless of
/// orientation, so draining a queue is deterministic for a given set of entries.
#[derive(Debug, Clone)]
pub struct BalanceQueue {
    orientation: Orientation,
    heap: BinaryHeap<(Amount, Reverse<String>)>,
}

impl BalanceQueue {
    /// Creates an empty queue.
    pub fn new(orientation: Orientation) -> Self {
        BalanceQueue {
            orientation,
            heap: BinaryHeap::new(),
        }
    }

    /// Adds a person with their balance.
    pub fn push(&mut self, person: String, balance: Amount) {
        self.heap.push((self.orientation.key(balance), Reverse(person)));
    }

    /// Removes and returns the extremal entry.
    pub fn pop(&mut self) -> Option<(String, Amount)> {
        self.heap
            .pop()
            .map(|(key, Reverse(person))| (person, self.orientation.key(key)))
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
