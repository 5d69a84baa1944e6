//! Per-component state cells and post-commit effects.
//!
//! Hooks are addressed by call order: the n-th hook call of a render reads the
//! n-th record of the same fiber's previous pass. A component must therefore
//! call the same hooks in the same order on every pass.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::element::{Component, Element, Props};
use crate::runtime::RuntimeHandle;
use crate::same_value::SameValue;

pub type Cleanup = Box<dyn FnOnce()>;
type CleanupSlot = Rc<RefCell<Option<Cleanup>>>;

/// Value returned by an effect, optionally carrying its cleanup.
pub struct EffectResult {
    cleanup: Option<Cleanup>,
}

impl EffectResult {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    fn into_cleanup(self) -> Option<Cleanup> {
        self.cleanup
    }
}

impl Default for EffectResult {
    fn default() -> Self {
        Self { cleanup: None }
    }
}

/// Type-erased dependency value compared with [`SameValue`].
pub trait DepValue: Any {
    fn same_dep(&self, other: &dyn DepValue) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: SameValue + 'static> DepValue for T {
    fn same_dep(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self.same_value(other))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ordered dependency list of an effect. Build it with [`deps!`](crate::deps).
#[derive(Default)]
pub struct Deps(Vec<Box<dyn DepValue>>);

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: impl SameValue + 'static) -> Self {
        self.0.push(Box::new(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn same_as(&self, previous: &Deps) -> bool {
        self.len() == previous.len()
            && self
                .0
                .iter()
                .zip(&previous.0)
                .all(|(next, prev)| next.same_dep(&**prev))
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deps(len = {})", self.len())
    }
}

#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Deps::new()$(.with($value))+
    };
}

/// An effect should run when there is no previous dependency list, no current
/// one, or any element differs by position.
pub fn deps_changed(previous: Option<&Deps>, next: Option<&Deps>) -> bool {
    match (previous, next) {
        (Some(previous), Some(next)) => !next.same_as(previous),
        _ => true,
    }
}

enum Update<T> {
    Replace(T),
    Apply(Rc<dyn Fn(&T) -> T>),
}

impl<T: Clone> Clone for Update<T> {
    fn clone(&self) -> Self {
        match self {
            Update::Replace(value) => Update::Replace(value.clone()),
            Update::Apply(f) => Update::Apply(Rc::clone(f)),
        }
    }
}

impl<T: Clone> Update<T> {
    fn apply(&self, current: T) -> T {
        match self {
            Update::Replace(value) => value.clone(),
            Update::Apply(f) => f(&current),
        }
    }
}

/// Update queue shared by every pass of one state cell and by its setters.
struct StateQueue<T> {
    pending: RefCell<Vec<Update<T>>>,
    committed: RefCell<T>,
    runtime: RuntimeHandle,
}

impl<T: Clone> StateQueue<T> {
    fn new(initial: T, runtime: RuntimeHandle) -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            committed: RefCell::new(initial),
            runtime,
        }
    }

    /// Committed value with every queued update applied in order, plus the
    /// number of updates folded in.
    fn fold(&self) -> (T, usize) {
        let updates: Vec<Update<T>> = self.pending.borrow().clone();
        let mut value = self.committed.borrow().clone();
        for update in &updates {
            value = update.apply(value);
        }
        (value, updates.len())
    }
}

/// Setter returned by [`use_state`]. Stable across passes: every pass of the
/// same cell hands out a setter sharing one queue.
pub struct StateSetter<T> {
    queue: Rc<StateQueue<T>>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<T> SameValue for StateSetter<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl<T: SameValue + Clone + 'static> StateSetter<T> {
    pub fn set(&self, value: T) {
        if self.is_noop(|_| value.clone()) {
            return;
        }
        self.enqueue(Update::Replace(value));
    }

    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        if self.is_noop(&f) {
            return;
        }
        self.enqueue(Update::Apply(Rc::new(f)));
    }

    /// Value as of the last commit.
    pub fn committed(&self) -> T {
        self.queue.committed.borrow().clone()
    }

    fn is_noop(&self, f: impl FnOnce(&T) -> T) -> bool {
        if !self.queue.pending.borrow().is_empty() {
            return false;
        }
        let committed = self.committed();
        f(&committed).same_value(&committed)
    }

    fn enqueue(&self, update: Update<T>) {
        self.queue.pending.borrow_mut().push(update);
        self.queue.runtime.request_pass();
    }
}

pub trait StateSlot: Any {
    /// Drops the updates folded into this pass and records its value as
    /// committed.
    fn commit(&mut self);
    fn as_any(&self) -> &dyn Any;
}

struct StateCell<T> {
    queue: Rc<StateQueue<T>>,
    value: T,
    consumed: usize,
}

impl<T: Clone + 'static> StateSlot for StateCell<T> {
    fn commit(&mut self) {
        let mut pending = self.queue.pending.borrow_mut();
        let consumed = self.consumed.min(pending.len());
        pending.drain(..consumed);
        *self.queue.committed.borrow_mut() = self.value.clone();
        self.consumed = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct EffectCell {
    deps: Option<Deps>,
    cleanup: CleanupSlot,
}

impl EffectCell {
    fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

pub enum HookRecord {
    State(Box<dyn StateSlot>),
    Effect(EffectCell),
}

impl HookRecord {
    pub(crate) fn commit(&mut self) {
        if let HookRecord::State(slot) = self {
            slot.commit();
        }
    }

    pub(crate) fn run_cleanup(&self) {
        if let HookRecord::Effect(cell) = self {
            cell.run_cleanup();
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            HookRecord::State(_) => "use_state",
            HookRecord::Effect(_) => "use_effect",
        }
    }
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Effect queued by a render, run after its pass commits.
pub struct PendingEffect {
    effect: Box<dyn FnOnce() -> EffectResult>,
    cleanup: CleanupSlot,
}

impl PendingEffect {
    pub(crate) fn run(self) {
        let previous = self.cleanup.borrow_mut().take();
        if let Some(previous) = previous {
            previous();
        }
        let result = (self.effect)();
        *self.cleanup.borrow_mut() = result.into_cleanup();
    }
}

struct HookFrame {
    previous: Vec<HookRecord>,
    hooks: Vec<HookRecord>,
    effects: Vec<PendingEffect>,
    runtime: RuntimeHandle,
    component: &'static str,
}

thread_local! {
    static CURRENT_FRAME: RefCell<Option<HookFrame>> = RefCell::new(None);
}

fn with_frame<R>(f: impl FnOnce(&mut HookFrame) -> R) -> R {
    CURRENT_FRAME.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(frame) => f(frame),
            None => panic!("hooks can only be called while a component renders"),
        }
    })
}

fn hook_order_violation(component: &str, index: usize, expected: &str) -> ! {
    panic!("hook order changed between passes in {component}: hook #{index} is not {expected}")
}

pub(crate) struct RenderOutput {
    pub element: Element,
    pub hooks: Vec<HookRecord>,
    pub effects: Vec<PendingEffect>,
}

/// Calls `component` with a hook frame installed. `previous` holds the hook
/// records of the fiber's last pass, or `None` for a fresh fiber; it is left
/// unchanged. Panics inside the component are returned as `Err(message)`.
pub(crate) fn render_component(
    component: &Component,
    props: &Props,
    previous: Option<&mut Vec<HookRecord>>,
    runtime: RuntimeHandle,
    verify_hook_order: bool,
) -> Result<RenderOutput, String> {
    let reused = previous.is_some();
    let mut empty = Vec::new();
    let previous = previous.unwrap_or(&mut empty);
    let frame = HookFrame {
        previous: mem::take(previous),
        hooks: Vec::new(),
        effects: Vec::new(),
        runtime,
        component: component.name(),
    };
    let outer = CURRENT_FRAME.with(|slot| slot.borrow_mut().replace(frame));
    let result = panic::catch_unwind(AssertUnwindSafe(|| component.render(props)));
    let frame = CURRENT_FRAME.with(|slot| mem::replace(&mut *slot.borrow_mut(), outer));
    let Some(frame) = frame else {
        return Err("hook frame vanished during render".to_owned());
    };
    *previous = frame.previous;

    let element = result.map_err(panic_message)?;
    if reused && verify_hook_order && frame.hooks.len() != previous.len() {
        return Err(format!(
            "hook order changed between passes in {}: {} hooks called, {} expected",
            component.name(),
            frame.hooks.len(),
            previous.len()
        ));
    }
    Ok(RenderOutput {
        element,
        hooks: frame.hooks,
        effects: frame.effects,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Returns the current value of this component's state cell and its setter.
/// `init` runs only on the first pass of the fiber.
pub fn use_state<T>(init: impl FnOnce() -> T) -> (T, StateSetter<T>)
where
    T: SameValue + Clone + 'static,
{
    let (existing, runtime) = with_frame(|frame| {
        let index = frame.hooks.len();
        let existing = match frame.previous.get(index) {
            Some(HookRecord::State(slot)) => match slot.as_any().downcast_ref::<StateCell<T>>() {
                Some(cell) => Some(Rc::clone(&cell.queue)),
                None => hook_order_violation(frame.component, index, "a state of this type"),
            },
            Some(_) => hook_order_violation(frame.component, index, "use_state"),
            None => None,
        };
        (existing, frame.runtime.clone())
    });
    let queue = match existing {
        Some(queue) => queue,
        None => Rc::new(StateQueue::new(init(), runtime)),
    };
    let (value, consumed) = queue.fold();
    with_frame(|frame| {
        frame.hooks.push(HookRecord::State(Box::new(StateCell {
            queue: Rc::clone(&queue),
            value: value.clone(),
            consumed,
        })));
    });
    (value, StateSetter { queue })
}

/// Queues `effect` to run after this pass commits, unless `deps` is the same
/// as on the previous pass. The previous cleanup runs first.
pub fn use_effect<F>(effect: F, deps: Option<Deps>)
where
    F: FnOnce() -> EffectResult + 'static,
{
    with_frame(|frame| {
        let index = frame.hooks.len();
        let (cleanup, changed) = match frame.previous.get(index) {
            Some(HookRecord::Effect(cell)) => (
                Rc::clone(&cell.cleanup),
                deps_changed(cell.deps.as_ref(), deps.as_ref()),
            ),
            Some(_) => hook_order_violation(frame.component, index, "use_effect"),
            None => (Rc::new(RefCell::new(None)), true),
        };
        if changed {
            frame.effects.push(PendingEffect {
                effect: Box::new(effect),
                cleanup: Rc::clone(&cleanup),
            });
        }
        frame.hooks.push(HookRecord::Effect(EffectCell { deps, cleanup }));
    });
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
