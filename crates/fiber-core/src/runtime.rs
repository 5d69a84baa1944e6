use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::RuntimeScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    pass_requested: Cell<bool>,
    needs_slice: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            pass_requested: Cell::new(false),
            needs_slice: Cell::new(false),
        }
    }

    fn schedule(&self) {
        self.needs_slice.set(true);
        self.scheduler.request_work_slice();
    }

    fn request_pass(&self) {
        if !self.pass_requested.replace(true) {
            log::debug!("fresh pass requested");
        }
        self.schedule();
    }
}

/// Shared scheduling state of one root: pending pass requests and the
/// platform scheduler used to ask for more work slices.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn request_pass(&self) {
        self.inner.request_pass();
    }

    pub fn has_pass_request(&self) -> bool {
        self.inner.pass_requested.get()
    }

    pub(crate) fn take_pass_request(&self) -> bool {
        self.inner.pass_requested.replace(false)
    }

    /// Asks the platform for another slice of the work loop.
    pub fn request_work_slice(&self) {
        self.inner.schedule();
    }

    pub fn needs_slice(&self) -> bool {
        self.inner.needs_slice.get()
    }

    pub fn set_needs_slice(&self, value: bool) {
        self.inner.needs_slice.set(value);
    }
}

/// Weak reference to a [`Runtime`] held by state setters, so a setter that
/// outlives its root is inert.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn request_pass(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_pass();
        } else {
            log::warn!("state update on a dropped root ignored");
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn request_work_slice(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    requests: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn request_work_slice(&self) {
        self.requests
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
