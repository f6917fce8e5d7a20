use crate::TimerError;

/// Construction parameters for a [`MultiTimer`](crate::MultiTimer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Instance name for logging
    pub name: String,

    /// Maximum number of delivered payloads waiting to be read
    pub capacity: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            name: "multi_timer".to_string(),
            capacity: 1,
        }
    }
}

impl TimerConfig {
    /// Default configuration with the given output capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the instance name used in log messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the output capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TimerError> {
        if self.capacity == 0 {
            return Err(TimerError::ZeroCapacity);
        }
        Ok(())
    }
}
