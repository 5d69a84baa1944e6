//! Cooperative, resumable work loop.

use crate::commit::CommitReport;
use crate::element::{Element, ElementType};
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberId};
use crate::hooks::render_component;
use crate::host::Host;
use crate::platform::Deadline;
use crate::reconciler::reconcile_children;
use crate::root::FiberRoot;

#[derive(Debug)]
pub enum WorkStatus {
    /// No pass was in progress and none was requested.
    Idle,
    /// The deadline ran out; the walk resumes from the stored unit of work.
    Yielded,
    /// The pass finished and its tree is now the committed one.
    Committed(CommitReport),
}

impl<H: Host> FiberRoot<H> {
    /// Performs at least one unit of work, then keeps going while `deadline`
    /// has at least the configured yield threshold left. Commits when the walk
    /// completes.
    ///
    /// On error the pass in progress is discarded without touching the
    /// committed tree. Another work slice is always requested before
    /// returning.
    pub fn schedule_tick(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        self.runtime.set_needs_slice(false);
        let status = self.work_loop(deadline);
        if let Err(err) = &status {
            log::debug!("pass failed: {err}");
            self.abandon_pass();
        }
        self.runtime.request_work_slice();
        status
    }

    fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        let mut performed = 0usize;
        loop {
            self.start_requested_pass();
            let Some(unit) = self.next_unit else {
                break;
            };
            if performed > 0 && deadline.time_remaining() < self.config.yield_threshold {
                log::trace!("yielding after {performed} units of work");
                return Ok(WorkStatus::Yielded);
            }
            self.next_unit = self.perform_unit_of_work(unit)?;
            performed += 1;
        }

        if self.wip.is_some() {
            let report = self.commit_root()?;
            return Ok(WorkStatus::Committed(report));
        }
        Ok(WorkStatus::Idle)
    }

    /// Replaces any pass in progress with a fresh one when a state update
    /// asked for it. Requests wait until a tree has been committed.
    fn start_requested_pass(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        if !self.runtime.take_pass_request() {
            return;
        }
        // A pass started by `render` carries the newest description.
        let source = self.wip.unwrap_or(current);
        let source_fiber = &self.tree[source];
        let mut fiber = Fiber::new(source_fiber.element.clone());
        fiber.handle = source_fiber.handle.clone();
        fiber.alternate = if Some(source) == self.wip {
            source_fiber.alternate
        } else {
            Some(current)
        };
        let root = self.tree.insert(fiber);
        if self.wip.is_some() {
            log::debug!("superseding pass in progress");
        }
        self.wip = Some(root);
        self.next_unit = Some(root);
        self.deletions.clear();
    }

    /// Local work for one fiber: produce its child descriptions, reconcile
    /// them, and return the next fiber in pre-order.
    pub(crate) fn perform_unit_of_work(
        &mut self,
        id: FiberId,
    ) -> Result<Option<FiberId>, RenderError> {
        log::trace!("unit of work: {}", self.tree[id].label());
        let elements = if self.tree[id].is_component() {
            vec![self.render_fiber(id)?]
        } else {
            self.tree[id].element.children().to_vec()
        };
        reconcile_children(&mut self.tree, id, &elements, &mut self.deletions);
        let bound = self.wip.unwrap_or(id);
        Ok(self.tree.next_in_preorder(id, bound))
    }

    fn render_fiber(&mut self, id: FiberId) -> Result<Element, RenderError> {
        let element = self.tree[id].element.clone();
        let ElementType::Component(component) = element.kind() else {
            return Ok(element);
        };
        let runtime = self.runtime.handle();
        let previous = match self.tree[id].alternate {
            Some(alternate) => Some(&mut self.tree[alternate].hooks),
            None => None,
        };
        let output = render_component(
            component,
            element.props(),
            previous,
            runtime,
            self.config.verify_hook_order,
        )
        .map_err(|message| RenderError::ComponentPanicked {
            component: component.name(),
            message,
        })?;

        let fiber = &mut self.tree[id];
        fiber.hooks = output.hooks;
        fiber.pending_effects = output.effects;
        Ok(output.element)
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
