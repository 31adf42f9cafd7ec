//! Monotonic sequence numbers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arbor_scope::Entry;

/// Shared counter handing out increasing numbers
#[derive(Debug)]
pub struct Sequence {
    next: AtomicU64,
}

/// One number drawn from a [`Sequence`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(pub u64);

impl Sequence {
    /// Sequence whose first number is `start`
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Draw the next number
    pub fn next(&self) -> SequenceNumber {
        SequenceNumber(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The number the next call to [`Sequence::next`] will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Factory entry drawing a fresh number on every resolution
    pub fn entry(self: &Arc<Self>) -> Entry<SequenceNumber> {
        let sequence = Arc::clone(self);
        Entry::factory(move |_| Arc::new(sequence.next()))
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(1)
    }
}
