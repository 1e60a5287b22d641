use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::MAX_SEQUENCE;

/// Hands out write sequence numbers.
///
/// A number is *allocated* by [`next`](Self::next) and becomes visible to
/// readers only once the writer [`publish`](Self::publish)es it. Sequence 0 is
/// never allocated: it is the read point of an empty store.
#[derive(Debug)]
pub struct SequenceAllocator {
    next_sequence: AtomicU64,
    last_sequence: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self {
            next_sequence: AtomicU64::new(1),
            last_sequence: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        let seq = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        assert!(seq <= MAX_SEQUENCE, "sequence number space exhausted");
        seq
    }

    /// Makes every write up to and including `seq` visible to readers.
    pub fn publish(&self, seq: u64) {
        self.last_sequence.fetch_max(seq, Ordering::Release);
    }

    /// The newest sequence visible to readers.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }

    /// Resumes numbering after `seq`, e.g. once a log has been replayed.
    pub fn recover(&self, seq: u64) {
        self.next_sequence.fetch_max(seq + 1, Ordering::SeqCst);
        self.publish(seq);
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
