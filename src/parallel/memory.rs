use crate::parallel::{HandleId, ParallelBackend, ParallelRef};
use crate::{CounterError, SequentialCounter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace, warn};

#[cfg(feature = "parking_lot")]
use parking_lot::{Mutex, RwLock};

#[cfg(not(feature = "parking_lot"))]
use std::sync::{Mutex, RwLock};

/// An in-process [ParallelBackend].
///
/// Every handle owns its own lock-guarded [SequentialCounter], and the handle table sits behind a read/write lock.
/// Updates to different handles therefore only contend on the (shared) table read lock,
/// while updates to the same handle are serialized by that handle's mutex.
///
/// The backend also acts as the registry gating who may allocate handles:
/// while it is unavailable, `create` fails with `FactoryUnavailable`. Existing handles keep working.
///
/// Handle ids come from a monotonic sequence and are never reused.
///
/// Using a [ParallelRef] that was not issued by this backend (or was already destroyed) panics.
#[derive(Debug)]
pub struct InMemoryBackend {
    available: AtomicBool,
    next_handle: AtomicU64,
    handles: RwLock<HashMap<HandleId, Mutex<SequentialCounter>>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        InMemoryBackend::new()
    }
}

impl InMemoryBackend {
    /// Creates a new backend that is available for issuing handles.
    #[inline]
    pub fn new() -> InMemoryBackend {
        InMemoryBackend::with_availability(true)
    }

    /// Creates a new backend that refuses to issue handles until made available.
    #[inline]
    pub fn unavailable() -> InMemoryBackend {
        InMemoryBackend::with_availability(false)
    }

    fn with_availability(available: bool) -> InMemoryBackend {
        InMemoryBackend {
            available: AtomicBool::new(available),
            next_handle: AtomicU64::new(0),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `create` currently succeeds.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Opens or closes the registry for new handles.
    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::SeqCst);
        if previous != available {
            debug!(available, "parallel counter registry availability changed");
        }
    }

    /// The number of handles that were created but not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.read_table().len()
    }

    // Runs `f` on the counter behind `counter`, holding its lock.
    fn with_counter<R>(
        &self,
        counter: &ParallelRef,
        f: impl FnOnce(&mut SequentialCounter) -> R,
    ) -> R {
        let table = self.read_table();
        let slot = match table.get(&counter.handle()) {
            Some(slot) => slot,
            None => panic!(
                "Parallel counter handle {:?} is not live in this backend.",
                counter.handle()
            ),
        };
        let mut locked = lock(slot);
        f(&mut *locked)
    }

    #[cfg(feature = "parking_lot")]
    #[inline]
    fn read_table(
        &self,
    ) -> impl std::ops::Deref<Target = HashMap<HandleId, Mutex<SequentialCounter>>> + '_ {
        self.handles.read()
    }

    #[cfg(not(feature = "parking_lot"))]
    #[inline]
    fn read_table(
        &self,
    ) -> impl std::ops::Deref<Target = HashMap<HandleId, Mutex<SequentialCounter>>> + '_ {
        self.handles.read().expect("Handle table lock failed. This indicates another user paniced while holding a lock to the table.")
    }

    #[cfg(feature = "parking_lot")]
    #[inline]
    fn write_table(
        &self,
    ) -> impl std::ops::DerefMut<Target = HashMap<HandleId, Mutex<SequentialCounter>>> + '_ {
        self.handles.write()
    }

    #[cfg(not(feature = "parking_lot"))]
    #[inline]
    fn write_table(
        &self,
    ) -> impl std::ops::DerefMut<Target = HashMap<HandleId, Mutex<SequentialCounter>>> + '_ {
        self.handles.write().expect("Handle table lock failed. This indicates another user paniced while holding a lock to the table.")
    }
}

#[cfg(feature = "parking_lot")]
#[inline]
fn lock(slot: &Mutex<SequentialCounter>) -> impl std::ops::DerefMut<Target = SequentialCounter> + '_ {
    slot.lock()
}

#[cfg(not(feature = "parking_lot"))]
#[inline]
fn lock(slot: &Mutex<SequentialCounter>) -> impl std::ops::DerefMut<Target = SequentialCounter> + '_ {
    slot.lock().expect("Parallel counter lock failed. This indicates another user paniced while holding a lock to the counter.")
}

impl ParallelBackend for InMemoryBackend {
    fn create(&self, limit: u128) -> Result<ParallelRef, CounterError> {
        if !self.is_available() {
            warn!(limit, "refusing to create parallel counter, registry unavailable");
            return Err(CounterError::FactoryUnavailable);
        }
        let handle = HandleId::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.write_table()
            .insert(handle, Mutex::new(SequentialCounter::new(limit)));
        trace!(handle = handle.get(), limit, "created parallel counter");
        Ok(ParallelRef::new(handle, limit))
    }

    fn add(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError> {
        self.with_counter(counter, |c| c.add(value))
    }

    fn sub(&self, counter: &ParallelRef, value: u128) -> Result<(), CounterError> {
        self.with_counter(counter, |c| c.sub(value))
    }

    fn read(&self, counter: &ParallelRef) -> u128 {
        self.with_counter(counter, |c| c.read())
    }

    fn destroy(&self, counter: ParallelRef) {
        let removed = self.write_table().remove(&counter.handle());
        match removed {
            Some(_) => trace!(handle = counter.handle().get(), "destroyed parallel counter"),
            None => panic!(
                "Parallel counter handle {:?} is not live in this backend.",
                counter.handle()
            ),
        }
    }
}
