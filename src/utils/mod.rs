//! Concurrency helpers shared by the metadata caches.

mod bitset;
mod synchronization;

pub(crate) use bitset::AtomicBitSet;
pub use synchronization::ThreeState;
pub(crate) use synchronization::{publish_once, AtomicThreeState};
