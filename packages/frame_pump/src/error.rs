use thiserror::Error;

/// Errors reported when building a [`FramePump`][crate::FramePump].
///
/// All variants are recoverable: fix the offending argument and build again.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The reschedule interval cannot be zero: hosts interpret a zero reschedule
    /// value as "stop calling me".
    #[error("the tick interval cannot be 0")]
    ZeroInterval,

    /// A zero time budget would forbid starting even a single item per tick.
    #[error("the per-tick time budget cannot be zero")]
    ZeroTimeBudget,

    /// The item-count and wall-clock budget strategies are mutually exclusive.
    #[error("items_per_tick and time_per_tick cannot both be configured")]
    ConflictingBudgets,
}

/// Errors reported by [`Dispatcher::send`][crate::Dispatcher::send].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    /// The dispatcher was disposed before the continuation could be queued.
    #[error("the dispatcher has been disposed and no longer accepts cross-thread calls")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ConfigError: Send, Sync, Debug);
    assert_impl_all!(SendError: Send, Sync, Debug);

    #[test]
    fn config_errors_describe_the_offending_argument() {
        assert!(ConfigError::ZeroInterval.to_string().contains("interval"));
        assert!(ConfigError::ZeroTimeBudget.to_string().contains("budget"));
        assert!(
            ConfigError::ConflictingBudgets
                .to_string()
                .contains("items_per_tick")
        );
    }
}
