//! Bounded counters, with a parallel and a sequential representation.
//!
//! A bounded counter holds a value in `0..=limit`. Adding past the limit or subtracting below zero
//! fails, leaving the counter untouched.
//!
//! This crate offers three building blocks:
//! * [SequentialCounter], a plain in-place bounded integer.
//! * [ParallelBackend], the capability of a backing store that accepts concurrent updates to
//!   handles it issued. [InMemoryBackend] implements it in-process.
//! * [SwitchableCounter], a single logical counter backed by exactly one of the two,
//!   which can [switch](SwitchableCounter::switch) between them without losing its value.
//!
//! # Example
//! ```
//! use bounded_counter::{CounterError, SwitchableCounter};
//!
//! let mut counter = SwitchableCounter::new_shared(100, false).unwrap();
//! counter.add(40).unwrap();
//! counter.switch().unwrap();
//! counter.add(50).unwrap();
//! assert_eq!(counter.read(), 90);
//! assert!(matches!(counter.add(11), Err(CounterError::Overflow { .. })));
//! ```

use std::sync::Arc;

mod error;
mod sequential;
mod switchable;

/// The parallel-update capability and its in-process implementation.
pub mod parallel;

pub use error::CounterError;
pub use parallel::memory::InMemoryBackend;
pub use parallel::{HandleId, ParallelBackend, ParallelRef};
pub use sequential::SequentialCounter;
pub use switchable::{Representation, SwitchableCounter};

lazy_static::lazy_static! {
    static ref SHARED_BACKEND: Arc<InMemoryBackend> = Arc::new(InMemoryBackend::new());
}

/// The process-wide [InMemoryBackend], created on first use.
///
/// It starts out available. Gating it with `set_available` affects every counter using it.
pub fn shared_backend() -> Arc<InMemoryBackend> {
    Arc::clone(&SHARED_BACKEND)
}
