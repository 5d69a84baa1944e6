//! Platform abstraction traits for the work scheduler.
//!
//! The engine never reads a clock or spawns work itself. It asks the host
//! platform for another slice of time and checks a deadline between units of
//! work, so it can be embedded in event loops with different timing models.

use std::time::Duration;

/// Schedules work slices for the runtime.
///
/// Implementations must be safe to use from multiple threads so a waker on
/// another thread can be notified.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host call back into the work loop when it is idle.
    fn request_work_slice(&self);
}

/// Answers how much time the current work slice has left.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Provides timing information for the runtime.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;

    /// Returns the time elapsed since `since`.
    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// A deadline `budget` after the instant it was started at.
pub struct ClockDeadline<'a, C: Clock> {
    clock: &'a C,
    started: C::Instant,
    budget: Duration,
}

impl<'a, C: Clock> ClockDeadline<'a, C> {
    pub fn start(clock: &'a C, budget: Duration) -> Self {
        Self {
            clock,
            started: clock.now(),
            budget,
        }
    }
}

impl<C: Clock> Deadline for ClockDeadline<'_, C> {
    fn time_remaining(&self) -> Duration {
        self.budget
            .saturating_sub(self.clock.elapsed(self.started))
    }
}

/// Never runs out of time. Used to drive a pass to completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

