//! Fiber arena: one mutable work record per description node, linked by id.

use std::ops::{Index, IndexMut};

use slotmap::{new_key_type, SlotMap};

use crate::collections::map::HashSet;
use crate::element::{Element, ElementType};
use crate::hooks::{HookRecord, PendingEffect};

new_key_type! {
    pub struct FiberId;
}

/// Pending host mutation recorded by the reconciler and consumed by the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTag {
    Placement,
    Update,
    Deletion,
}

pub struct Fiber<H> {
    pub element: Element,
    pub handle: Option<H>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub alternate: Option<FiberId>,
    pub effect: Option<EffectTag>,
    pub hooks: Vec<HookRecord>,
    pub pending_effects: Vec<PendingEffect>,
}

impl<H> Fiber<H> {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            handle: None,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            effect: None,
            hooks: Vec::new(),
            pending_effects: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ElementType {
        self.element.kind()
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind(), ElementType::Component(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), ElementType::Text)
    }

    /// Debug label: tag, `#text`, or the component name.
    pub fn label(&self) -> &str {
        match self.kind() {
            ElementType::Host(tag) => tag,
            ElementType::Text => "#text",
            ElementType::Component(component) => component.name(),
        }
    }
}

pub struct FiberTree<H> {
    fibers: SlotMap<FiberId, Fiber<H>>,
}

impl<H> Default for FiberTree<H> {
    fn default() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }
}

impl<H> FiberTree<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fiber: Fiber<H>) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<H>> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<H>> {
        self.fibers.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Direct children of `id` in sibling order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut children = Vec::new();
        let mut cursor = self.fibers.get(id).and_then(|fiber| fiber.child);
        while let Some(child) = cursor {
            children.push(child);
            cursor = self.fibers[child].sibling;
        }
        children
    }

    /// Next fiber after `id` in a pre-order walk that never leaves the
    /// subtree rooted at `bound`.
    pub fn next_in_preorder(&self, id: FiberId, bound: FiberId) -> Option<FiberId> {
        if let Some(child) = self.fibers[id].child {
            return Some(child);
        }
        self.next_skipping_children(id, bound)
    }

    /// Like [`next_in_preorder`](Self::next_in_preorder) but does not descend
    /// into `id`'s children.
    pub fn next_skipping_children(&self, id: FiberId, bound: FiberId) -> Option<FiberId> {
        let mut cursor = id;
        loop {
            if cursor == bound {
                return None;
            }
            let fiber = &self.fibers[cursor];
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent?;
        }
    }

    /// `root` and every descendant, parents first.
    pub fn preorder(&self, root: FiberId) -> Vec<FiberId> {
        let mut order = Vec::new();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            order.push(id);
            cursor = self.next_in_preorder(id, root);
        }
        order
    }

    /// `root` and every descendant, children before their parent.
    pub fn postorder(&self, root: FiberId) -> Vec<FiberId> {
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            let children = self.children(id);
            for child in children.into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Splices `id` out of its parent's child list. The fiber and its subtree
    /// stay in the arena until the next sweep.
    pub fn unlink(&mut self, id: FiberId) {
        let Some(parent) = self.fibers.get(id).and_then(|fiber| fiber.parent) else {
            return;
        };
        let next = self.fibers[id].sibling.take();
        if self.fibers[parent].child == Some(id) {
            self.fibers[parent].child = next;
            return;
        }
        let mut cursor = self.fibers[parent].child;
        while let Some(sibling) = cursor {
            if self.fibers[sibling].sibling == Some(id) {
                self.fibers[sibling].sibling = next;
                return;
            }
            cursor = self.fibers[sibling].sibling;
        }
    }

    /// Drops every fiber not reachable from `root` and severs the remaining
    /// `alternate` links. Returns the number of reclaimed fibers.
    pub fn retain_reachable(&mut self, root: FiberId) -> usize {
        let reachable: HashSet<FiberId> = self.preorder(root).into_iter().collect();
        let before = self.fibers.len();
        self.fibers.retain(|id, fiber| {
            fiber.alternate = None;
            reachable.contains(&id)
        });
        before - self.fibers.len()
    }
}

impl<H> Index<FiberId> for FiberTree<H> {
    type Output = Fiber<H>;

    fn index(&self, id: FiberId) -> &Self::Output {
        &self.fibers[id]
    }
}

impl<H> IndexMut<FiberId> for FiberTree<H> {
    fn index_mut(&mut self, id: FiberId) -> &mut Self::Output {
        &mut self.fibers[id]
    }
}

#[cfg(test)]
#[path = "tests/fiber_tests.rs"]
mod tests;
