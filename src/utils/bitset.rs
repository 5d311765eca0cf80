//! Concurrent bit set over dense integer ids.
//!
//! Bits are packed into 64-bit atomic words. Setting a bit uses a read, OR, compare-and-swap
//! retry loop, so concurrent writers touching different bits of the same word never lose an
//! update. Bits are never cleared once set.

use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed-capacity bit set that can be updated through a shared reference.
///
/// # Examples
///
/// ```rust,ignore
/// let set = AtomicBitSet::new(100);
/// assert!(set.insert(42));
/// assert!(!set.insert(42));
/// assert!(set.contains(42));
/// ```
#[derive(Debug)]
pub struct AtomicBitSet {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl AtomicBitSet {
    /// Create an empty set able to hold ids `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: (0..num_words).map(|_| AtomicU64::new(0)).collect(),
            len: capacity,
        }
    }

    /// Number of ids the set can hold.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Acquire) == 0)
    }

    /// Returns true if `index` is set. Ids outside the capacity are never set.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }

        let mask = 1u64 << (index % 64);
        (self.words[index / 64].load(Ordering::Acquire) & mask) != 0
    }

    /// Set `index`. Returns true if this call set the bit, false if it was already set or `index`
    /// is outside the capacity.
    pub fn insert(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }

        let word = &self.words[index / 64];
        let mask = 1u64 << (index % 64);

        let mut current = word.load(Ordering::Acquire);
        loop {
            if current & mask != 0 {
                return false;
            }

            match word.compare_exchange_weak(
                current,
                current | mask,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }
}
