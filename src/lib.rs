//! # Multi Timer
//!
//! A delay queue for Rust built on top of Tokio: schedule any number of payloads
//! for future delivery while a single underlying timer stays armed for the
//! earliest deadline.
//!
//! ## Features
//!
//! - **Generic**: Payloads are any `T`; they are never compared or inspected
//! - **Ordered Delivery**: Earliest deadline first, equal deadlines in scheduling order
//! - **Bounded Output**: Due payloads that do not fit in the output channel are dropped
//! - **Thread-safe**: Schedule and stop from any thread through cloneable handles
//! - **Global Reset**: `stop` discards everything pending and leaves the timer reusable
//! - **Graceful Shutdown**: Support for cancellation tokens and clean shutdowns
//!
//! ## Quick Start
//!
//! ```rust
//! use multi_timer::{MultiTimer, TimerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Up to 10 delivered payloads may wait to be read
//!     let (timer, mut deliveries) = MultiTimer::spawn(TimerConfig::with_capacity(10))?;
//!
//!     timer.schedule_relative(Duration::from_millis(20), "second")?;
//!     timer.schedule_relative(Duration::from_millis(10), "first")?;
//!
//!     assert_eq!(deliveries.recv().await, Some("first"));
//!     assert_eq!(deliveries.recv().await, Some("second"));
//!
//!     // Drop everything still pending
//!     timer.stop();
//!     Ok(())
//! }
//! ```

mod config;
mod delivery;
mod error;
mod queue;
mod timer;

pub use config::TimerConfig;
pub use delivery::Deliveries;
pub use error::TimerError;
pub use timer::{MultiTimer, TimerDriver};

// Re-export commonly used types for convenience
pub use std::time::Duration;
pub use tokio::time::Instant;
pub use tokio_util::sync::CancellationToken;
