//! Publication primitives for lazily computed, shared state.
//!
//! All derived caches of [`crate::metadata::module::PeModule`] are pure functions of an immutable
//! image. They are therefore computed without holding a lock: concurrent callers may compute the
//! same value more than once, but only the first published value is retained and every reader
//! observes that single, fully formed value.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    OnceLock,
};

use crate::Result;

/// Return the value published in `cell`, computing and publishing it first if necessary.
///
/// `compute` runs outside of any lock. If another thread publishes first, the locally computed
/// value is dropped and the winner is returned. A failing `compute` publishes nothing, so a later
/// call will try again.
///
/// # Errors
/// Returns the error produced by `compute`.
pub fn publish_once<T, F>(cell: &OnceLock<T>, compute: F) -> Result<&T>
where
    F: FnOnce() -> Result<T>,
{
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let value = compute()?;
    Ok(cell.get_or_init(move || value))
}

/// A tri-state flag: not yet known, known true, known false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreeState {
    /// Not computed yet
    Unknown = 0,
    /// Computed, true
    True = 1,
    /// Computed, false
    False = 2,
}

impl ThreeState {
    fn from_u8(value: u8) -> ThreeState {
        match value {
            1 => ThreeState::True,
            2 => ThreeState::False,
            _ => ThreeState::Unknown,
        }
    }

    /// Returns `Some` once the state is known.
    #[must_use]
    pub fn value(self) -> Option<bool> {
        match self {
            ThreeState::Unknown => None,
            ThreeState::True => Some(true),
            ThreeState::False => Some(false),
        }
    }
}

impl From<bool> for ThreeState {
    fn from(value: bool) -> Self {
        if value {
            ThreeState::True
        } else {
            ThreeState::False
        }
    }
}

/// A [`ThreeState`] that can be shared between threads.
#[derive(Debug)]
pub struct AtomicThreeState(AtomicU8);

impl AtomicThreeState {
    /// Create a flag in the given state.
    #[must_use]
    pub const fn new(state: ThreeState) -> Self {
        AtomicThreeState(AtomicU8::new(state as u8))
    }

    /// Read the current state.
    pub fn load(&self) -> ThreeState {
        ThreeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Unconditionally set the state.
    pub fn store(&self, state: ThreeState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `Unknown` to `state`. Returns the state that is current afterwards, which is the
    /// previously published one if another thread got there first.
    pub fn publish(&self, state: ThreeState) -> ThreeState {
        match self.0.compare_exchange(
            ThreeState::Unknown as u8,
            state as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => state,
            Err(current) => ThreeState::from_u8(current),
        }
    }
}

impl Default for AtomicThreeState {
    fn default() -> Self {
        Self::new(ThreeState::Unknown)
    }
}
