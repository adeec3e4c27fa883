use crate::parallel::{ParallelBackend, ParallelRef};
use crate::{CounterError, SequentialCounter};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Which representation backs a [SwitchableCounter].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// A handle inside a [ParallelBackend], accepting concurrent updates.
    Parallel,
    /// A plain in-place [SequentialCounter].
    Sequential,
}

impl Representation {
    /// Maps the `parallel` flag used by the constructors to a representation.
    #[inline]
    pub fn from_parallel(parallel: bool) -> Representation {
        if parallel {
            Representation::Parallel
        } else {
            Representation::Sequential
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        self == Representation::Parallel
    }

    /// The representation `switch` moves to.
    #[inline]
    pub fn flipped(self) -> Representation {
        match self {
            Representation::Parallel => Representation::Sequential,
            Representation::Sequential => Representation::Parallel,
        }
    }
}

// Exactly one representation is populated, always.
enum Repr {
    Parallel(ParallelRef),
    Sequential(SequentialCounter),
}

/// A bounded counter that can move between a parallel and a sequential representation.
///
/// Callers only ever see one logical counter: a value in `0..=limit`, with `add`, `sub` and `read`
/// delegated to whichever representation is active. [switch](#method.switch) rebuilds the counter in
/// the other representation, carrying over value and limit.
///
/// Parallel representations are issued by the backend `B`. The counter owns its handle exclusively and
/// releases it when destroyed or dropped. Mutation needs `&mut self`, so operations on one
/// instance are always observed in program order.
///
/// # Example
/// ```
/// use bounded_counter::{InMemoryBackend, SwitchableCounter};
/// use std::sync::Arc;
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let mut counter = SwitchableCounter::new(backend, 100, false).unwrap();
/// counter.add(40).unwrap();
/// counter.switch().unwrap();
/// assert!(counter.is_parallel());
/// assert_eq!(counter.read(), 40);
/// ```
pub struct SwitchableCounter<B: ParallelBackend> {
    backend: Arc<B>,
    repr: Repr,
}

impl<B: ParallelBackend> SwitchableCounter<B> {
    /// Creates a new counter with value zero.
    ///
    /// If `parallel` is set, a handle is requested from `backend`, which fails with
    /// `FactoryUnavailable` if the backend is not issuing handles.
    pub fn new(backend: Arc<B>, limit: u128, parallel: bool) -> Result<Self, CounterError> {
        SwitchableCounter::with_representation(
            backend,
            limit,
            Representation::from_parallel(parallel),
        )
    }

    /// Like [new](#method.new), taking a [Representation] instead of a flag.
    pub fn with_representation(
        backend: Arc<B>,
        limit: u128,
        representation: Representation,
    ) -> Result<Self, CounterError> {
        let repr = create_repr(&*backend, limit, representation)?;
        trace!(limit, ?representation, "created switchable counter");
        Ok(SwitchableCounter { backend, repr })
    }

    /// Adds `value`, failing with `Overflow` if the limit would be exceeded.
    #[inline]
    pub fn add(&mut self, value: u128) -> Result<(), CounterError> {
        add_to(&*self.backend, &mut self.repr, value)
    }

    /// Subtracts `value`, failing with `Underflow` if the value would go below zero.
    #[inline]
    pub fn sub(&mut self, value: u128) -> Result<(), CounterError> {
        match &mut self.repr {
            Repr::Parallel(handle) => self.backend.sub(handle, value),
            Repr::Sequential(counter) => counter.sub(value),
        }
    }

    /// Gets the current value of the counter.
    #[inline]
    pub fn read(&self) -> u128 {
        read_from(&*self.backend, &self.repr)
    }

    /// Gets the limit of the counter. Never asks the backend.
    #[inline]
    pub fn limit(&self) -> u128 {
        match &self.repr {
            Repr::Parallel(handle) => handle.limit(),
            Repr::Sequential(counter) => counter.limit(),
        }
    }

    /// How much can still be added before hitting the limit.
    #[inline]
    pub fn headroom(&self) -> u128 {
        // The backend is trusted to keep read <= limit, but a broken one must not panic here.
        self.limit().saturating_sub(self.read())
    }

    #[inline]
    pub fn is_parallel(&self) -> bool {
        match self.repr {
            Repr::Parallel(_) => true,
            Repr::Sequential(_) => false,
        }
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        Representation::from_parallel(self.is_parallel())
    }

    /// The backend parallel handles are requested from.
    #[inline]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Moves the counter to the other representation, keeping its value and limit.
    ///
    /// The new representation is created empty and filled through the regular add path before the old one
    /// is released, so either the whole switch happens or nothing does:
    /// on error the counter is left exactly as it was.
    ///
    /// Switching to parallel fails with `FactoryUnavailable` if the backend is not issuing handles.
    /// Failing to re-add the value to the new representation means the counter's bookkeeping is broken,
    /// and is reported as `InvariantViolation`.
    pub fn switch(&mut self) -> Result<(), CounterError> {
        let value = self.read();
        let limit = self.limit();
        let from = self.representation();
        let to = from.flipped();

        let mut fresh = create_repr(&*self.backend, limit, to)?;
        if let Err(err) = add_to(&*self.backend, &mut fresh, value) {
            error!(value, limit, %err, "re-adding value after switch failed");
            release(&*self.backend, fresh);
            return Err(CounterError::InvariantViolation(
                "value did not fit into a fresh representation with the same limit",
            ));
        }

        let old = std::mem::replace(&mut self.repr, fresh);
        release(&*self.backend, old);
        debug!(value, limit, ?from, ?to, "switched counter representation");
        Ok(())
    }

    /// Destroys the counter, releasing its parallel handle if it has one.
    #[inline]
    pub fn destroy(self) {
        // Dropping does the releasing.
    }
}

impl SwitchableCounter<crate::InMemoryBackend> {
    /// Creates a new counter on the process-wide [shared_backend](crate::shared_backend).
    pub fn new_shared(limit: u128, parallel: bool) -> Result<Self, CounterError> {
        SwitchableCounter::new(crate::shared_backend(), limit, parallel)
    }
}

impl<B: ParallelBackend> Drop for SwitchableCounter<B> {
    fn drop(&mut self) {
        let limit = match &self.repr {
            Repr::Parallel(handle) => handle.limit(),
            Repr::Sequential(_) => return,
        };
        let placeholder = Repr::Sequential(SequentialCounter::new(limit));
        let old = std::mem::replace(&mut self.repr, placeholder);
        trace!("releasing switchable counter");
        release(&*self.backend, old);
    }
}

impl<B: ParallelBackend> fmt::Debug for SwitchableCounter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchableCounter")
            .field("representation", &self.representation())
            .field("value", &self.read())
            .field("limit", &self.limit())
            .finish()
    }
}

fn create_repr<B: ParallelBackend + ?Sized>(
    backend: &B,
    limit: u128,
    representation: Representation,
) -> Result<Repr, CounterError> {
    Ok(match representation {
        Representation::Parallel => Repr::Parallel(backend.create(limit)?),
        Representation::Sequential => Repr::Sequential(SequentialCounter::new(limit)),
    })
}

fn add_to<B: ParallelBackend + ?Sized>(
    backend: &B,
    repr: &mut Repr,
    value: u128,
) -> Result<(), CounterError> {
    match repr {
        Repr::Parallel(handle) => backend.add(handle, value),
        Repr::Sequential(counter) => counter.add(value),
    }
}

fn read_from<B: ParallelBackend + ?Sized>(backend: &B, repr: &Repr) -> u128 {
    match repr {
        Repr::Parallel(handle) => backend.read(handle),
        Repr::Sequential(counter) => counter.read(),
    }
}

fn release<B: ParallelBackend + ?Sized>(backend: &B, repr: Repr) {
    match repr {
        Repr::Parallel(handle) => backend.destroy(handle),
        Repr::Sequential(counter) => {
            counter.destroy();
        }
    }
}
