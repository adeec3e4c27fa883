/// Everything that can go wrong when operating on a bounded counter.
///
/// All errors are reported to the immediate caller. No operation retries internally,
/// so a caller that wants to retry an `add` should check the headroom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    /// An add would push the value above its limit, or above `u128::MAX`.
    #[error("adding {value} would exceed the limit of {limit}")]
    Overflow {
        /// The amount that was to be added.
        value: u128,
        /// The limit of the counter.
        limit: u128,
    },

    /// A sub would push the value below zero.
    #[error("subtracting {value} from {current} would go below zero")]
    Underflow {
        /// The amount that was to be subtracted.
        value: u128,
        /// The value of the counter at the time of the call.
        current: u128,
    },

    /// A parallel representation was requested, but no factory is available to issue one.
    #[error("no parallel counter factory is available")]
    FactoryUnavailable,

    /// The counter's internal bookkeeping is broken. This is a programming error, not a recoverable condition.
    #[error("counter invariant violated: {0}")]
    InvariantViolation(&'static str),
}
