use crate::CounterError;
use std::sync::Arc;

/// An in-process parallel backend, implemented using lock-guarded handles.
pub mod memory;

/// Opaque identifier of a handle issued by a [ParallelBackend].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Creates a handle id. Only backends should need this.
    #[inline]
    pub const fn new(id: u64) -> HandleId {
        HandleId(id)
    }

    /// Gets the raw id.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// An exclusively owned reference to a parallel counter living inside a [ParallelBackend].
///
/// The limit is stored alongside the handle, so it can be read without asking the backend.
/// This type is deliberately not `Clone`: whoever holds it is the only one allowed to destroy it.
#[derive(Debug, PartialEq, Eq)]
pub struct ParallelRef {
    handle: HandleId,
    limit: u128,
}

impl ParallelRef {
    /// Creates a reference. Backends call this when issuing a new handle.
    #[inline]
    pub const fn new(handle: HandleId, limit: u128) -> ParallelRef {
        ParallelRef { handle, limit }
    }

    /// The handle this reference points to.
    #[inline]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// The limit the referenced counter was created with.
    #[inline]
    pub fn limit(&self) -> u128 {
        self.limit
    }
}

/// The capability to create and update parallel counters.
///
/// Implementations must accept concurrent `add`/`sub` calls from many threads without
/// any coordination by the caller, and enforce the same bounds a
/// [SequentialCounter](crate::SequentialCounter) does: `0 <= value <= limit`,
/// leaving the value untouched when an operation fails.
///
/// Passing a reference that was not issued by the same backend is a contract breach;
/// implementations may panic.
pub trait ParallelBackend: Send + Sync {
    /// Issues a new counter with value zero.
    ///
    /// Fails with `FactoryUnavailable` if the backend is not currently allowed to issue handles.
    fn create(&self, limit: u128) -> Result<ParallelRef, CounterError>;

    /// Adds `value`, failing with `Overflow` if the limit would be exceeded.
    fn add(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError>;

    /// Subtracts `value`, failing with `Underflow` if the value would go below zero.
    fn sub(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError>;

    /// Materializes the current value.
    fn read(&self, counter: &ParallelRef) -> u128;

    /// Releases the handle.
    fn destroy(&self, counter: ParallelRef);
}

macro_rules! forward_backend {
    ($( $wrapper:ty ), *) => {
        $(
            impl<B: ParallelBackend + ?Sized> ParallelBackend for $wrapper {
                #[inline]
                fn create(&self, limit: u128) -> Result<ParallelRef, CounterError> {
                    (**self).create(limit)
                }

                #[inline]
                fn add(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError> {
                    (**self).add(counter, value)
                }

                #[inline]
                fn sub(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError> {
                    (**self).sub(counter, value)
                }

                #[inline]
                fn read(&self, counter: &ParallelRef) -> u128 {
                    (**self).read(counter)
                }

                #[inline]
                fn destroy(&self, counter: ParallelRef) {
                    (**self).destroy(counter)
                }
            }
        )*
    };
}

forward_backend![&B, Arc<B>, Box<B>];

#[cfg(test)]
mod tests {

    use super::*;
    use crate::InMemoryBackend;

    fn exercise<B: ParallelBackend>(backend: B) {
        let counter = backend.create(10).unwrap();
        backend.add(&counter, 7).unwrap();
        backend.sub(&counter, 2).unwrap();
        assert_eq!(backend.read(&counter), 5);
        assert!(backend.add(&counter, 6).is_err());
        backend.destroy(counter);
    }

    #[test]
    fn forwards_through_reference() {
        let backend = InMemoryBackend::new();
        exercise(&backend);
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn forwards_through_box() {
        exercise(Box::new(InMemoryBackend::new()));
    }

    #[test]
    fn forwards_through_boxed_trait_object() {
        let backend: Box<dyn ParallelBackend> = Box::new(InMemoryBackend::new());
        exercise(backend);
    }

    #[test]
    fn forwards_through_arc() {
        let backend = Arc::new(InMemoryBackend::new());
        exercise(Arc::clone(&backend));
        assert_eq!(backend.live_handles(), 0);
    }
}
