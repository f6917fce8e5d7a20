use thiserror::Error;

/// Errors reported by [`MultiTimer`](crate::MultiTimer).
///
/// A full output channel is never an error: overflowing payloads are dropped
/// inside the driver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimerError {
    /// The delay was negative, NaN or too large to represent.
    #[error("invalid delay: {0}s")]
    InvalidDelay(f64),

    /// `now + delay` does not fit in the clock.
    #[error("deadline overflows the clock")]
    DeadlineOverflow,

    /// The output channel needs room for at least one payload.
    #[error("output capacity must be greater than zero")]
    ZeroCapacity,

    /// The driver has stopped, either through its cancellation token or
    /// because every handle was dropped.
    #[error("timer '{0}' has shut down")]
    Shutdown(String),

    /// `spawn` was called outside a Tokio runtime.
    #[error("no Tokio runtime available to drive the timer")]
    NoRuntime,
}
