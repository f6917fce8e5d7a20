use std::future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::delivery::{self, Deliveries, Outbox};
use crate::queue::DeadlineQueue;
use crate::{TimerConfig, TimerError};

/// State of the single underlying timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Unarmed,
    Armed { deadline: Instant },
}

impl TimerState {
    fn deadline(self) -> Option<Instant> {
        match self {
            TimerState::Unarmed => None,
            TimerState::Armed { deadline } => Some(deadline),
        }
    }
}

/// Everything guarded by the engine lock. The timer state always mirrors
/// the queue: armed iff the queue is non-empty, at its minimum deadline.
#[derive(Debug)]
struct Engine<T> {
    queue: DeadlineQueue<T>,
    timer: TimerState,
    closed: bool,
}

impl<T> Engine<T> {
    /// Re-derive the timer state from the queue head. Returns true when
    /// the armed deadline changed and the driver has to be woken.
    fn rearm(&mut self) -> bool {
        let next = match self.queue.peek_min() {
            Some(entry) => TimerState::Armed {
                deadline: entry.deadline,
            },
            None => TimerState::Unarmed,
        };
        let changed = next != self.timer;
        self.timer = next;
        changed
    }

    fn disarm(&mut self) -> (bool, usize) {
        let was_armed = self.timer != TimerState::Unarmed;
        let discarded = self.queue.len();
        self.queue.clear();
        self.timer = TimerState::Unarmed;
        (was_armed, discarded)
    }
}

#[derive(Debug)]
struct Shared<T> {
    name: String,
    engine: Mutex<Engine<T>>,
    rearm: Notify,
}

/// Handle for scheduling payloads on a timer.
///
/// Cheap to clone and safe to share between threads. All clones feed the
/// same queue and the same [`Deliveries`]. When the last clone is dropped
/// the driver shuts down and pending payloads are discarded.
pub struct MultiTimer<T> {
    shared: Arc<Shared<T>>,

    /// Cancelled by the caller's token or by the last handle going away
    shutdown: CancellationToken,

    /// Cancels `shutdown` when the last clone is dropped
    handles: Arc<DropGuard>,
}

impl<T> Clone for MultiTimer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            shutdown: self.shutdown.clone(),
            handles: Arc::clone(&self.handles),
        }
    }
}

impl<T> std::fmt::Debug for MultiTimer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiTimer")
            .field("name", &self.shared.name)
            .field("pending", &self.pending())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Task that sleeps until the earliest deadline and delivers due payloads.
///
/// Must be spawned (or otherwise polled) for anything to be delivered.
pub struct TimerDriver<T> {
    shared: Arc<Shared<T>>,

    /// Channel for delivering due payloads
    outbox: Outbox<T>,

    /// The caller's token, kept to tell shutdown reasons apart
    cancel_token: CancellationToken,

    shutdown: CancellationToken,
}

impl<T> MultiTimer<T> {
    /// Create a timer with a bounded output channel.
    ///
    /// # Arguments
    /// * `config` - Instance name and output capacity
    /// * `cancel_token` - Cancelling it shuts the driver down
    ///
    /// Returns (MultiTimer, TimerDriver, Deliveries). The driver must be
    /// spawned before anything is delivered.
    pub fn new(
        config: TimerConfig,
        cancel_token: CancellationToken,
    ) -> Result<(Self, TimerDriver<T>, Deliveries<T>), TimerError> {
        config.validate()?;
        let TimerConfig { name, capacity } = config;

        let shared = Arc::new(Shared {
            name: name.clone(),
            engine: Mutex::new(Engine {
                queue: DeadlineQueue::new(),
                timer: TimerState::Unarmed,
                closed: false,
            }),
            rearm: Notify::new(),
        });
        let (outbox, deliveries) = delivery::bounded(name, capacity);
        let shutdown = cancel_token.child_token();

        let timer = MultiTimer {
            shared: Arc::clone(&shared),
            shutdown: shutdown.clone(),
            handles: Arc::new(shutdown.clone().drop_guard()),
        };

        let driver = TimerDriver {
            shared,
            outbox,
            cancel_token,
            shutdown,
        };

        Ok((timer, driver, deliveries))
    }

    /// Create a timer and spawn its driver on the current Tokio runtime.
    pub fn spawn(config: TimerConfig) -> Result<(Self, Deliveries<T>), TimerError>
    where
        T: Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let (timer, driver, deliveries) = Self::new(config, CancellationToken::new())?;
        runtime.spawn(driver.run());
        Ok((timer, deliveries))
    }

    /// Deliver `payload` once `delay` has elapsed.
    pub fn schedule_relative(&self, delay: Duration, payload: T) -> Result<(), TimerError> {
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or(TimerError::DeadlineOverflow)?;
        self.schedule_absolute(deadline, payload)
    }

    /// Deliver `payload` after `delay` seconds.
    ///
    /// Negative, NaN and unrepresentable delays are rejected with
    /// [`TimerError::InvalidDelay`].
    pub fn schedule_secs_f64(&self, delay: f64, payload: T) -> Result<(), TimerError> {
        let delay =
            Duration::try_from_secs_f64(delay).map_err(|_| TimerError::InvalidDelay(delay))?;
        self.schedule_relative(delay, payload)
    }

    /// Deliver `payload` at `instant`. An instant in the past is due
    /// immediately.
    pub fn schedule_absolute(
        &self,
        instant: impl Into<Instant>,
        payload: T,
    ) -> Result<(), TimerError> {
        let deadline = instant.into();
        let mut engine = self.shared.engine.lock();
        if engine.closed || self.shutdown.is_cancelled() {
            return Err(TimerError::Shutdown(self.shared.name.clone()));
        }
        let sequence = engine.queue.push(deadline, payload);
        let rearmed = engine.rearm();
        drop(engine);

        log::trace!(
            "Entry #{} scheduled on timer '{}' for {:?}",
            sequence,
            self.shared.name,
            deadline
        );
        if rearmed {
            self.shared.rearm.notify_one();
        }
        Ok(())
    }

    /// Discard every pending payload and disarm the timer.
    ///
    /// Payloads already sitting in [`Deliveries`] stay there. The timer
    /// remains usable afterwards.
    pub fn stop(&self) {
        let (was_armed, discarded) = self.shared.engine.lock().disarm();
        if was_armed {
            self.shared.rearm.notify_one();
        }
        log::debug!(
            "Timer '{}' stopped, discarded {} pending payload(s)",
            self.shared.name,
            discarded
        );
    }

    /// Number of payloads waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.shared.engine.lock().queue.len()
    }

    /// Deadline the timer is currently armed for.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.engine.lock().timer.deadline()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// True once the driver has been told to shut down.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<T> TimerDriver<T> {
    /// Run the timer until its token is cancelled or every handle is dropped.
    pub async fn run(self) {
        log::info!("Timer '{}' started", self.shared.name);

        loop {
            let armed = self.shared.engine.lock().timer;

            tokio::select! {
                biased;

                // Handle cancellation token
                _ = self.shutdown.cancelled() => {
                    if self.cancel_token.is_cancelled() {
                        log::info!("Timer '{}' cancelled via token", self.shared.name);
                    } else {
                        log::info!("Timer '{}' shutting down - all handles dropped", self.shared.name);
                    }
                    break;
                },

                // Armed deadline moved or timer was stopped
                _ = self.shared.rearm.notified() => {},

                _ = wait_until(armed) => {
                    self.fire();
                },
            }
        }

        let (_, discarded) = {
            let mut engine = self.shared.engine.lock();
            engine.closed = true;
            engine.disarm()
        };
        log::info!(
            "Timer '{}' stopped, {} pending payload(s) discarded",
            self.shared.name,
            discarded
        );
    }

    /// Deliver everything that is due. Payloads are pushed outside the lock,
    /// earliest first; whatever does not fit is dropped.
    fn fire(&self) {
        let now = Instant::now();
        let due = {
            let mut engine = self.shared.engine.lock();
            if engine.timer == TimerState::Unarmed {
                // Expiry raced with stop
                log::trace!("Timer '{}' ignoring stale expiry", self.shared.name);
                return;
            }
            let due = engine.queue.drain_due(now);
            engine.rearm();
            due
        };

        let total = due.len();
        let delivered = due
            .into_iter()
            .map(|entry| self.outbox.try_push(entry.payload))
            .filter(|pushed| *pushed)
            .count();
        log::trace!(
            "Timer '{}' fired: {} due, {} delivered",
            self.shared.name,
            total,
            delivered
        );
    }
}

async fn wait_until(state: TimerState) {
    match state.deadline() {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}
