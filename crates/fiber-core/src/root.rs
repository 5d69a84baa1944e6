use std::sync::Arc;

use crate::commit::CommitReport;
use crate::config::RootConfig;
use crate::element::{h, Element};
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberId, FiberTree};
use crate::host::Host;
use crate::platform::{RuntimeScheduler, Unbounded};
use crate::runtime::{DefaultScheduler, Runtime};
use crate::scheduler::WorkStatus;

/// Tag of the synthetic host element wrapping the rendered description.
pub const ROOT_TAG: &str = "#root";

/// Owns the host, the fiber arena and the scheduler state of one render
/// target.
pub struct FiberRoot<H: Host> {
    pub(crate) host: H,
    pub(crate) tree: FiberTree<H::Handle>,
    pub(crate) current: Option<FiberId>,
    pub(crate) wip: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) runtime: Runtime,
    pub(crate) config: RootConfig,
}

impl<H: Host> FiberRoot<H> {
    pub fn new(host: H) -> Self {
        Self::with_scheduler(host, Arc::new(DefaultScheduler))
    }

    pub fn with_scheduler(host: H, scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            host,
            tree: FiberTree::new(),
            current: None,
            wip: None,
            next_unit: None,
            deletions: Vec::new(),
            runtime: Runtime::new(scheduler),
            config: RootConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RootConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts a pass rendering `element` as the only child of `container`.
    ///
    /// Nothing touches the host until the pass commits. When the container is
    /// the one of the committed tree, the pass diffs against it; otherwise the
    /// description is materialized from scratch.
    pub fn render(&mut self, element: impl Into<Element>, container: H::Handle) {
        let description = h(ROOT_TAG).child(element).build();
        let alternate = self
            .current
            .filter(|current| self.tree[*current].handle.as_ref() == Some(&container));
        let mut fiber = Fiber::new(description);
        fiber.handle = Some(container);
        fiber.alternate = alternate;
        let root = self.tree.insert(fiber);

        // The new pass folds every queued state update.
        self.runtime.take_pass_request();
        self.wip = Some(root);
        self.next_unit = Some(root);
        self.deletions.clear();
        log::debug!("render scheduled (diffing: {})", alternate.is_some());
        self.runtime.request_work_slice();
    }

    /// Runs unbounded ticks until no work is left, returning every commit
    /// made on the way. Effects that update state cause further commits.
    pub fn flush(&mut self) -> Result<Vec<CommitReport>, RenderError> {
        let mut reports = Vec::new();
        loop {
            match self.schedule_tick(&Unbounded)? {
                WorkStatus::Committed(report) => reports.push(report),
                WorkStatus::Yielded => {}
                WorkStatus::Idle => return Ok(reports),
            }
        }
    }

    /// True when a pass is in progress or a state update awaits one.
    pub fn has_pending_work(&self) -> bool {
        self.next_unit.is_some()
            || self.wip.is_some()
            || (self.current.is_some() && self.runtime.has_pass_request())
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    pub fn tree(&self) -> &FiberTree<H::Handle> {
        &self.tree
    }

    /// Root fiber of the last committed tree.
    pub fn current_root(&self) -> Option<FiberId> {
        self.current
    }

    /// Root fiber of the pass in progress.
    pub fn work_in_progress(&self) -> Option<FiberId> {
        self.wip
    }

    pub fn next_unit_of_work(&self) -> Option<FiberId> {
        self.next_unit
    }

    pub(crate) fn abandon_pass(&mut self) {
        if let Some(root) = self.wip.take() {
            log::debug!("abandoning pass rooted at {root:?}");
        }
        self.next_unit = None;
        self.deletions.clear();
    }
}

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod tests;
