//! Standard scheduling services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform abstraction
//! traits defined in `fiber-core`. Applications construct a [`StdRuntime`],
//! create roots through it, and pump work slices from their event loop
//! whenever [`StdRuntime::take_slice_request`] reports pending work.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{
    Clock, ClockDeadline, CommitReport, FiberRoot, Host, RenderError, RuntimeScheduler, WorkStatus,
};

type SliceWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records slice requests and pokes an optional waker, so an
/// event loop on another thread can be woken up.
pub struct StdScheduler {
    slice_requested: AtomicBool,
    slice_waker: RwLock<Option<SliceWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            slice_requested: AtomicBool::new(false),
            slice_waker: RwLock::new(None),
        }
    }

    /// Returns whether a work slice has been requested since the last call.
    pub fn take_slice_request(&self) -> bool {
        self.slice_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a work slice is requested.
    pub fn set_slice_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .slice_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered slice waker.
    pub fn clear_slice_waker(&self) {
        *self
            .slice_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .slice_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "slice_requested",
                &self.slice_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn request_work_slice(&self) {
        self.slice_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Clock implementation backed by [`std::time`].
#[derive(Debug, Default, Clone)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Convenience container bundling the standard scheduler and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Arc<StdClock>,
    slice_budget: Duration,
}

impl StdRuntime {
    /// Default length of one work slice, roughly one frame at 60 Hz.
    pub const DEFAULT_SLICE: Duration = Duration::from_millis(16);

    pub fn new() -> Self {
        Self {
            scheduler: Arc::new(StdScheduler::default()),
            clock: Arc::new(StdClock),
            slice_budget: Self::DEFAULT_SLICE,
        }
    }

    pub fn with_slice_budget(mut self, budget: Duration) -> Self {
        self.slice_budget = budget;
        self
    }

    /// Creates a root whose work slices are requested through this runtime.
    pub fn create_root<H: Host>(&self, host: H) -> FiberRoot<H> {
        FiberRoot::with_scheduler(host, self.scheduler.clone())
    }

    /// Runs one work slice of `root` against the wall clock.
    pub fn run_slice<H: Host>(&self, root: &mut FiberRoot<H>) -> Result<WorkStatus, RenderError> {
        let deadline = ClockDeadline::start(&*self.clock, self.slice_budget);
        root.schedule_tick(&deadline)
    }

    /// Runs slices until `root` has no work left, returning the commits made.
    pub fn run_until_idle<H: Host>(
        &self,
        root: &mut FiberRoot<H>,
    ) -> Result<Vec<CommitReport>, RenderError> {
        let mut reports = Vec::new();
        let mut slices = 0usize;
        while root.has_pending_work() {
            slices += 1;
            if let WorkStatus::Committed(report) = self.run_slice(root)? {
                reports.push(report);
            }
        }
        log::debug!("idle after {slices} slices, {} commits", reports.len());
        Ok(reports)
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns the clock implementation.
    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    pub fn slice_budget(&self) -> Duration {
        self.slice_budget
    }

    /// Returns whether a work slice was requested since the last poll.
    pub fn take_slice_request(&self) -> bool {
        self.scheduler.take_slice_request()
    }

    /// Registers a waker to be called when a root requests a work slice.
    pub fn set_slice_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_slice_waker(waker);
    }

    /// Clears any previously registered slice waker.
    pub fn clear_slice_waker(&self) {
        self.scheduler.clear_slice_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .field("slice_budget", &self.slice_budget)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
