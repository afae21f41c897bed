//! Size-bounded, append-only record of timestamped readings.

use std::collections::VecDeque;

use crate::models::HistoricalEntry;

/// Default number of entries retained.
pub const MAX_HISTORY: usize = 500;

/// FIFO ring of [`HistoricalEntry`] values.
///
/// Entries are kept in arrival order. When full, the oldest entry is evicted
/// before a new one is added. An entry whose timestamp equals the most recent
/// entry's timestamp replaces it instead of being appended. Out-of-order
/// timestamps are stored as delivered.
#[derive(Debug, Clone)]
pub struct HistoricalBuffer {
    entries: VecDeque<HistoricalEntry>,
    capacity: usize,
}

impl HistoricalBuffer {
    /// Creates an empty buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends `entry`, coalescing with the latest entry on equal timestamps.
    pub fn append(&mut self, entry: HistoricalEntry) {
        if let Some(last) = self.entries.back_mut() {
            if last.timestamp == entry.timestamp {
                *last = entry;
                return;
            }
            if entry.timestamp < last.timestamp {
                tracing::debug!(
                    last = %last.timestamp,
                    incoming = %entry.timestamp,
                    "Appending out-of-order history entry."
                );
            }
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoricalEntry> {
        self.entries.iter().copied().collect()
    }

    /// Removes every entry. Used when the upstream source is reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoricalBuffer {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}
