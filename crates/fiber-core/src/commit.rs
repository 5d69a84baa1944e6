//! Commit phase: the only code that mutates the host.

use std::mem;

use crate::element::{event_name, is_event_attribute, ElementType, PropValue, Props, TEXT_VALUE};
use crate::collections::map::HashSet;
use crate::error::RenderError;
use crate::fiber::{EffectTag, FiberId};
use crate::host::{Host, HostError};
use crate::root::FiberRoot;
use crate::same_value::SameValue;

/// Summary of the host mutations and effects of one commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitReport {
    /// Host nodes created and inserted.
    pub placements: usize,
    /// `Update` fibers whose diff changed at least one attribute or binding.
    pub updates: usize,
    /// `Update` fibers whose diff was empty.
    pub unchanged: usize,
    pub attribute_updates: usize,
    pub listener_updates: usize,
    /// Fibers removed together with their subtrees.
    pub deletions: usize,
    pub effects_run: usize,
    /// Fibers dropped from the arena after the commit.
    pub reclaimed: usize,
}

#[derive(Default)]
struct DiffCount {
    attributes: usize,
    listeners: usize,
}

impl<H: Host> FiberRoot<H> {
    /// Applies the pass rooted at the work-in-progress root to the host and
    /// makes it the committed tree, then runs queued effects.
    pub(crate) fn commit_root(&mut self) -> Result<CommitReport, RenderError> {
        let Some(root) = self.wip else {
            return Ok(CommitReport::default());
        };
        let mut report = CommitReport::default();
        let mut inserted = Vec::new();
        let visited = match self.commit_mutations(root, &mut report, &mut inserted) {
            Ok(visited) => visited,
            Err(err) => {
                self.undo_insertions(inserted);
                return Err(err.into());
            }
        };

        // State cells only advance once the host reflects the whole pass.
        for id in visited {
            for hook in &mut self.tree[id].hooks {
                hook.commit();
            }
        }
        self.tree[root].effect = None;

        self.current = Some(root);
        self.wip = None;
        self.next_unit = None;

        report.effects_run = self.run_passive_effects(root);
        report.reclaimed = self.tree.retain_reachable(root);
        log::debug!(
            "committed: {} placed, {} updated, {} unchanged, {} deleted, {} effects",
            report.placements,
            report.updates,
            report.unchanged,
            report.deletions,
            report.effects_run
        );
        Ok(report)
    }

    /// Applies deletions, then placements and updates in pre-order. Returns
    /// the visited fibers. `inserted` collects the top-most host nodes
    /// inserted so far.
    fn commit_mutations(
        &mut self,
        root: FiberId,
        report: &mut CommitReport,
        inserted: &mut Vec<(H::Handle, H::Handle)>,
    ) -> Result<Vec<FiberId>, HostError> {
        for deleted in mem::take(&mut self.deletions) {
            self.commit_deletion(deleted)?;
            report.deletions += 1;
        }

        let mut visited = Vec::new();
        let mut placed = HashSet::default();
        let mut cursor = self.tree[root].child;
        while let Some(id) = cursor {
            let descend = match self.tree[id].effect {
                Some(EffectTag::Placement) => {
                    if self.commit_placement(id, &placed, inserted)? {
                        report.placements += 1;
                    }
                    placed.insert(id);
                    true
                }
                Some(EffectTag::Update) => {
                    if let Some(diff) = self.commit_update(id)? {
                        if diff.attributes + diff.listeners > 0 {
                            report.updates += 1;
                        } else {
                            report.unchanged += 1;
                        }
                        report.attribute_updates += diff.attributes;
                        report.listener_updates += diff.listeners;
                    }
                    true
                }
                Some(EffectTag::Deletion) => false,
                None => true,
            };
            self.tree[id].effect = None;
            visited.push(id);
            cursor = if descend {
                self.tree.next_in_preorder(id, root)
            } else {
                self.tree.next_skipping_children(id, root)
            };
        }
        Ok(visited)
    }

    /// Detaches the host nodes a failed commit inserted under the committed
    /// tree, newest first. Failures here are logged and skipped.
    fn undo_insertions(&mut self, inserted: Vec<(H::Handle, H::Handle)>) {
        for (parent, child) in inserted.into_iter().rev() {
            if let Err(err) = self.host.remove_child(&parent, &child) {
                log::warn!("could not undo insertion after failed commit: {err}");
            }
        }
    }

    /// Runs effect cleanups over the deleted subtree, then detaches its
    /// top-most host nodes from the nearest host ancestor.
    fn commit_deletion(&mut self, id: FiberId) -> Result<(), HostError> {
        for fiber in self.tree.preorder(id) {
            for hook in &self.tree[fiber].hooks {
                hook.run_cleanup();
            }
        }
        let parent = self.host_parent(id)?;
        for handle in self.top_host_handles(id) {
            self.host.remove_child(&parent, &handle)?;
        }
        // The committed tree must stop referring to nodes the host dropped, in
        // case a later step of this commit fails.
        self.tree.unlink(id);
        Ok(())
    }

    /// Creates and inserts the host node of a placed fiber. Component fibers
    /// own no host node and return `false`. Insertions under a host node that
    /// was not placed by this commit are pushed onto `inserted`.
    fn commit_placement(
        &mut self,
        id: FiberId,
        placed: &HashSet<FiberId>,
        inserted: &mut Vec<(H::Handle, H::Handle)>,
    ) -> Result<bool, HostError> {
        let element = self.tree[id].element.clone();
        let handle = match element.kind() {
            ElementType::Component(_) => return Ok(false),
            ElementType::Text => {
                let handle = self.host.create_text(element.text_value().unwrap_or_default())?;
                apply_props(&mut self.host, &handle, None, element.props(), true)?;
                handle
            }
            ElementType::Host(tag) => {
                let handle = self.host.create_element(tag)?;
                apply_props(&mut self.host, &handle, None, element.props(), false)?;
                handle
            }
        };
        self.tree[id].handle = Some(handle.clone());

        let (parent_fiber, parent) = self.host_parent_fiber(id)?;
        let anchor = self.host_anchor(id);
        self.host.insert_before(&parent, &handle, anchor.as_ref())?;
        if !placed.contains(&parent_fiber) {
            inserted.push((parent, handle));
        }
        Ok(true)
    }

    /// Diffs the attributes of an updated fiber against its alternate.
    /// Returns `None` for component fibers.
    fn commit_update(&mut self, id: FiberId) -> Result<Option<DiffCount>, HostError> {
        let fiber = &self.tree[id];
        let (Some(handle), Some(alternate)) = (fiber.handle.clone(), fiber.alternate) else {
            return Ok(None);
        };
        let next = fiber.element.clone();
        let previous = self.tree[alternate].element.clone();
        if next.ptr_eq(&previous) {
            return Ok(Some(DiffCount::default()));
        }
        let diff = apply_props(
            &mut self.host,
            &handle,
            Some(previous.props()),
            next.props(),
            false,
        )?;
        Ok(Some(diff))
    }

    /// Nearest ancestor host handle, following parent links.
    fn host_parent(&self, id: FiberId) -> Result<H::Handle, HostError> {
        self.host_parent_fiber(id).map(|(_, handle)| handle)
    }

    fn host_parent_fiber(&self, id: FiberId) -> Result<(FiberId, H::Handle), HostError> {
        let mut cursor = self.tree[id].parent;
        while let Some(parent) = cursor {
            if let Some(handle) = &self.tree[parent].handle {
                return Ok((parent, handle.clone()));
            }
            cursor = self.tree[parent].parent;
        }
        Err(HostError::Missing {
            node: format!("host parent of {}", self.tree[id].label()),
        })
    }

    /// The host node that a placed fiber must be inserted before: the first
    /// node already in the host among its following siblings, climbing through
    /// ancestors that own no host node. `None` means append.
    fn host_anchor(&self, id: FiberId) -> Option<H::Handle> {
        let mut node = id;
        loop {
            let mut sibling = self.tree[node].sibling;
            while let Some(candidate) = sibling {
                if let Some(handle) = self.first_host_handle(candidate) {
                    return Some(handle);
                }
                sibling = self.tree[candidate].sibling;
            }
            let parent = self.tree[node].parent?;
            if self.tree[parent].handle.is_some() {
                return None;
            }
            node = parent;
        }
    }

    /// First host node owned by `id` or, for components, its descendants,
    /// ignoring fibers that are not in the host yet.
    fn first_host_handle(&self, id: FiberId) -> Option<H::Handle> {
        let fiber = &self.tree[id];
        if fiber.effect == Some(EffectTag::Placement) {
            return None;
        }
        if let Some(handle) = &fiber.handle {
            return Some(handle.clone());
        }
        self.tree
            .children(id)
            .into_iter()
            .find_map(|child| self.first_host_handle(child))
    }

    fn top_host_handles(&self, id: FiberId) -> Vec<H::Handle> {
        if let Some(handle) = &self.tree[id].handle {
            return vec![handle.clone()];
        }
        self.tree
            .children(id)
            .into_iter()
            .flat_map(|child| self.top_host_handles(child))
            .collect()
    }

    /// Runs the effects queued by the committed pass, children before their
    /// parent. Returns how many ran.
    fn run_passive_effects(&mut self, root: FiberId) -> usize {
        let mut effects = Vec::new();
        for id in self.tree.postorder(root) {
            effects.append(&mut self.tree[id].pending_effects);
        }
        let count = effects.len();
        for effect in effects {
            effect.run();
        }
        count
    }
}

/// Applies the difference between `previous` and `next` attributes to `node`:
/// stale bindings are removed, vanished attributes removed, new or changed
/// attributes set, then new or changed bindings added. `previous = None`
/// applies everything. `skip_text` leaves the text value alone for freshly
/// created text nodes.
fn apply_props<H: Host>(
    host: &mut H,
    node: &H::Handle,
    previous: Option<&Props>,
    next: &Props,
    skip_text: bool,
) -> Result<DiffCount, HostError> {
    let mut count = DiffCount::default();
    let changed = |name: &str, value: &PropValue, other: Option<&Props>| match other
        .and_then(|props| props.get(name))
    {
        Some(other) => !value.same_value(other),
        None => true,
    };

    if let Some(previous) = previous {
        for (name, value) in previous.iter().filter(|(name, _)| is_event_attribute(name)) {
            if changed(name, value, Some(next)) {
                if let Some(handler) = value.as_handler() {
                    host.remove_event_listener(node, &event_name(name), handler)?;
                    count.listeners += 1;
                }
            }
        }
        for (name, _) in previous.iter().filter(|(name, _)| !is_event_attribute(name)) {
            if !next.contains(name) {
                host.remove_attribute(node, name)?;
                count.attributes += 1;
            }
        }
    }

    for (name, value) in next.iter().filter(|(name, _)| !is_event_attribute(name)) {
        if skip_text && name == TEXT_VALUE {
            continue;
        }
        if changed(name, value, previous) {
            host.set_attribute(node, name, value)?;
            count.attributes += 1;
        }
    }
    for (name, value) in next.iter().filter(|(name, _)| is_event_attribute(name)) {
        if !changed(name, value, previous) {
            continue;
        }
        match value.as_handler() {
            Some(handler) => {
                host.add_event_listener(node, &event_name(name), handler)?;
                count.listeners += 1;
            }
            None => log::warn!("event attribute {name} is not a handler, ignored"),
        }
    }
    Ok(count)
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
