//! Positional child reconciliation.

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberId, FiberTree};

/// Builds the work-in-progress children of `wip` from `elements`, matching
/// them by position against the children of `wip`'s alternate.
///
/// A same-type pair yields an `Update` fiber that keeps the old host handle.
/// Otherwise the new element becomes a `Placement` fiber and the old fiber is
/// tagged `Deletion` and appended to `deletions`; a position whose type
/// changed gets both. Keys are not consulted.
pub fn reconcile_children<H: Clone>(
    tree: &mut FiberTree<H>,
    wip: FiberId,
    elements: &[Element],
    deletions: &mut Vec<FiberId>,
) {
    let mut old = tree[wip].alternate.and_then(|alternate| tree[alternate].child);
    let mut previous: Option<FiberId> = None;
    tree[wip].child = None;

    let mut index = 0;
    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let next = match (element, old) {
            (Some(element), Some(old_id)) if element.same_type(&tree[old_id].element) => {
                let mut fiber = Fiber::new(element.clone());
                fiber.handle = tree[old_id].handle.clone();
                fiber.parent = Some(wip);
                fiber.alternate = Some(old_id);
                fiber.effect = Some(EffectTag::Update);
                Some(tree.insert(fiber))
            }
            (element, old_fiber) => {
                if let Some(old_id) = old_fiber {
                    log::trace!("deleting {} at position {index}", tree[old_id].label());
                    tree[old_id].effect = Some(EffectTag::Deletion);
                    deletions.push(old_id);
                }
                element.map(|element| {
                    let mut fiber = Fiber::new(element.clone());
                    fiber.parent = Some(wip);
                    fiber.effect = Some(EffectTag::Placement);
                    tree.insert(fiber)
                })
            }
        };

        if let Some(next) = next {
            match previous {
                Some(prev) => tree[prev].sibling = Some(next),
                None => tree[wip].child = Some(next),
            }
            previous = Some(next);
        }

        old = old.and_then(|old_id| tree[old_id].sibling);
        index += 1;
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
