use crate::CounterError;

/// A plain, in-place bounded counter.
///
/// The value always stays within `0..=limit`. Failed operations leave the counter untouched.
///
/// This counter has no concurrency support of its own; mutation requires `&mut self`.
/// It is also what [InMemoryBackend](crate::InMemoryBackend) keeps behind each of its handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialCounter {
    value: u128,
    limit: u128,
}

impl SequentialCounter {
    /// Creates a new counter with value zero and the given limit. Can be used in const contexts.
    #[inline]
    pub const fn new(limit: u128) -> SequentialCounter {
        SequentialCounter { value: 0, limit }
    }

    /// Adds `value` to the counter.
    ///
    /// Fails with `Overflow` if the result would exceed the limit.
    #[inline]
    pub fn add(&mut self, value: u128) -> Result<(), CounterError> {
        // value <= limit always holds, so the subtraction cannot wrap.
        if value > self.limit - self.value {
            return Err(CounterError::Overflow {
                value,
                limit: self.limit,
            });
        }
        self.value += value;
        Ok(())
    }

    /// Subtracts `value` from the counter.
    ///
    /// Fails with `Underflow` if the result would be negative.
    #[inline]
    pub fn sub(&mut self, value: u128) -> Result<(), CounterError> {
        if value > self.value {
            return Err(CounterError::Underflow {
                value,
                current: self.value,
            });
        }
        self.value -= value;
        Ok(())
    }

    /// Gets the current value of the counter.
    #[inline]
    pub fn read(&self) -> u128 {
        self.value
    }

    /// Gets the configured limit.
    #[inline]
    pub fn limit(&self) -> u128 {
        self.limit
    }

    /// How much can still be added before hitting the limit.
    #[inline]
    pub fn headroom(&self) -> u128 {
        self.limit - self.value
    }

    /// Consumes the counter, returning its limit.
    #[inline]
    pub fn destroy(self) -> u128 {
        self.limit
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sequential_new_const() {
        const COUNTER: SequentialCounter = SequentialCounter::new(10);
        assert_eq!(COUNTER.read(), 0);
        assert_eq!(COUNTER.limit(), 10);
    }

    #[test]
    fn add_up_to_limit() {
        let mut counter = SequentialCounter::new(10);
        counter.add(3).unwrap();
        assert_eq!(counter.read(), 3);
        counter.add(7).unwrap();
        assert_eq!(counter.read(), 10);
        assert_eq!(counter.headroom(), 0);
    }

    #[test]
    fn overflow_leaves_value() {
        let mut counter = SequentialCounter::new(10);
        counter.add(10).unwrap();
        assert_eq!(
            counter.add(1),
            Err(CounterError::Overflow {
                value: 1,
                limit: 10
            })
        );
        assert_eq!(counter.read(), 10);
    }

    #[test]
    fn underflow_leaves_value() {
        let mut counter = SequentialCounter::new(10);
        assert_eq!(
            counter.sub(1),
            Err(CounterError::Underflow {
                value: 1,
                current: 0
            })
        );
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn max_limit_does_not_wrap() {
        let mut counter = SequentialCounter::new(u128::MAX);
        counter.add(u128::MAX).unwrap();
        assert!(matches!(counter.add(1), Err(CounterError::Overflow { .. })));
        assert_eq!(counter.read(), u128::MAX);
        counter.sub(u128::MAX).unwrap();
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn zero_limit() {
        let mut counter = SequentialCounter::new(0);
        counter.add(0).unwrap();
        counter.sub(0).unwrap();
        assert!(counter.add(1).is_err());
        assert!(counter.sub(1).is_err());
        assert_eq!(counter.destroy(), 0);
    }

    #[test]
    fn destroy_returns_limit() {
        let mut counter = SequentialCounter::new(42);
        counter.add(5).unwrap();
        assert_eq!(counter.destroy(), 42);
    }

    proptest! {
        #[test]
        fn stays_within_bounds(limit in 0u128..1_000, ops in prop::collection::vec((any::<bool>(), 0u128..400), 0..64)) {
            let mut counter = SequentialCounter::new(limit);
            for (is_add, amount) in ops {
                let before = counter.read();
                let result = if is_add { counter.add(amount) } else { counter.sub(amount) };
                if result.is_err() {
                    prop_assert_eq!(counter.read(), before);
                }
                prop_assert!(counter.read() <= counter.limit());
            }
        }

        #[test]
        fn add_then_sub_restores(limit in any::<u128>(), start in any::<u128>(), amount in any::<u128>()) {
            let mut counter = SequentialCounter::new(limit);
            counter.add(start % (limit / 2 + 1)).unwrap();
            let before = counter.read();
            let amount = amount % counter.headroom().saturating_add(1);
            counter.add(amount).unwrap();
            counter.sub(amount).unwrap();
            prop_assert_eq!(counter.read(), before);
        }
    }
}
