use std::cell::Cell;
use std::fmt;
use std::mem;
use std::time::Duration;

use fiber_core::{
    CommitReport, Deadline, Element, EventHandler, FiberRoot, Host, HostError, MemoryHost,
    MemoryNodeId, PropValue, RenderError, RootConfig, WorkStatus,
};

/// Initializes `env_logger` for tests. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One host mutation as seen by a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp<N> {
    CreateElement { tag: String },
    CreateText { text: String },
    SetAttribute { node: N, name: String, value: String },
    RemoveAttribute { node: N, name: String },
    AddListener { node: N, event: String },
    RemoveListener { node: N, event: String },
    Insert { parent: N, child: N, anchor: Option<N> },
    Remove { parent: N, child: N },
}

impl<N> HostOp<N> {
    /// Short label without node handles, convenient for order assertions.
    pub fn label(&self) -> String {
        match self {
            HostOp::CreateElement { tag } => format!("create <{tag}>"),
            HostOp::CreateText { text } => format!("create {text:?}"),
            HostOp::SetAttribute { name, value, .. } => format!("set {name}={value}"),
            HostOp::RemoveAttribute { name, .. } => format!("unset {name}"),
            HostOp::AddListener { event, .. } => format!("listen {event}"),
            HostOp::RemoveListener { event, .. } => format!("unlisten {event}"),
            HostOp::Insert { anchor: Some(_), .. } => "insert".to_owned(),
            HostOp::Insert { anchor: None, .. } => "append".to_owned(),
            HostOp::Remove { .. } => "remove".to_owned(),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HostOp::CreateElement { .. }
                | HostOp::CreateText { .. }
                | HostOp::Insert { .. }
                | HostOp::Remove { .. }
        )
    }
}

/// Host wrapper that logs every mutation before delegating it.
#[derive(Default)]
pub struct RecordingHost<H: Host> {
    inner: H,
    ops: Vec<HostOp<H::Handle>>,
}

impl<H: Host> RecordingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            ops: Vec::new(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn ops(&self) -> &[HostOp<H::Handle>] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp<H::Handle>> {
        mem::take(&mut self.ops)
    }
}

impl<H: Host> fmt::Debug for RecordingHost<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingHost")
            .field("ops", &self.ops)
            .finish()
    }
}

impl<H: Host> Host for RecordingHost<H> {
    type Handle = H::Handle;

    fn create_element(&mut self, tag: &str) -> Result<Self::Handle, HostError> {
        self.ops.push(HostOp::CreateElement {
            tag: tag.to_owned(),
        });
        self.inner.create_element(tag)
    }

    fn create_text(&mut self, text: &str) -> Result<Self::Handle, HostError> {
        self.ops.push(HostOp::CreateText {
            text: text.to_owned(),
        });
        self.inner.create_text(text)
    }

    fn set_attribute(
        &mut self,
        node: &Self::Handle,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::SetAttribute {
            node: node.clone(),
            name: name.to_owned(),
            value: value.to_string(),
        });
        self.inner.set_attribute(node, name, value)
    }

    fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), HostError> {
        self.ops.push(HostOp::RemoveAttribute {
            node: node.clone(),
            name: name.to_owned(),
        });
        self.inner.remove_attribute(node, name)
    }

    fn add_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::AddListener {
            node: node.clone(),
            event: event.to_owned(),
        });
        self.inner.add_event_listener(node, event, handler)
    }

    fn remove_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::RemoveListener {
            node: node.clone(),
            event: event.to_owned(),
        });
        self.inner.remove_event_listener(node, event, handler)
    }

    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        anchor: Option<&Self::Handle>,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::Insert {
            parent: parent.clone(),
            child: child.clone(),
            anchor: anchor.cloned(),
        });
        self.inner.insert_before(parent, child, anchor)
    }

    fn remove_child(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::Remove {
            parent: parent.clone(),
            child: child.clone(),
        });
        self.inner.remove_child(parent, child)
    }
}

/// Deadline that always reports the same remaining time.
#[derive(Debug, Clone, Copy)]
pub struct FixedDeadline(pub Duration);

impl FixedDeadline {
    pub fn exhausted() -> Self {
        Self(Duration::ZERO)
    }
}

impl Deadline for FixedDeadline {
    fn time_remaining(&self) -> Duration {
        self.0
    }
}

/// Deadline that answers "plenty of time" for a fixed number of probes and
/// "no time" afterwards, making yield points deterministic.
#[derive(Debug)]
pub struct CountdownDeadline {
    probes: Cell<usize>,
}

impl CountdownDeadline {
    pub fn new(probes: usize) -> Self {
        Self {
            probes: Cell::new(probes),
        }
    }

    pub fn remaining_probes(&self) -> usize {
        self.probes.get()
    }
}

impl Deadline for CountdownDeadline {
    fn time_remaining(&self) -> Duration {
        match self.probes.get() {
            0 => Duration::ZERO,
            left => {
                self.probes.set(left - 1);
                Duration::from_secs(1)
            }
        }
    }
}

pub type TestHost = RecordingHost<MemoryHost>;

/// A root rendering into a recorded in-memory container.
pub struct TestRoot {
    root: FiberRoot<TestHost>,
    container: MemoryNodeId,
}

impl TestRoot {
    pub fn new() -> Self {
        Self::with_config(RootConfig::default().with_hook_order_checks(true))
    }

    pub fn with_config(config: RootConfig) -> Self {
        init_logging();
        let mut memory = MemoryHost::new();
        let container = memory.create_container();
        Self {
            root: FiberRoot::new(RecordingHost::new(memory)).with_config(config),
            container,
        }
    }

    /// Starts a pass for `element`; call [`flush`](Self::flush) or
    /// [`tick`](Self::tick) to make progress.
    pub fn render(&mut self, element: impl Into<Element>) -> &mut Self {
        self.root.render(element, self.container);
        self
    }

    pub fn flush(&mut self) -> Result<Vec<CommitReport>, RenderError> {
        self.root.flush()
    }

    /// Renders and flushes, expecting exactly one commit.
    pub fn mount(&mut self, element: impl Into<Element>) -> CommitReport {
        self.render(element);
        self.single_commit()
    }

    /// Flushes, expecting exactly one commit.
    pub fn single_commit(&mut self) -> CommitReport {
        let mut reports = self.flush().expect("render pass failed");
        assert_eq!(reports.len(), 1, "expected exactly one commit: {reports:?}");
        reports.remove(0)
    }

    pub fn tick(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        self.root.schedule_tick(deadline)
    }

    pub fn root(&self) -> &FiberRoot<TestHost> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut FiberRoot<TestHost> {
        &mut self.root
    }

    pub fn container(&self) -> MemoryNodeId {
        self.container
    }

    pub fn memory(&self) -> &MemoryHost {
        self.root.host().inner()
    }

    pub fn markup(&self) -> String {
        self.memory().to_markup(self.container)
    }

    pub fn text(&self) -> String {
        self.memory().text_content(self.container)
    }

    pub fn find(&self, tag: &str) -> Option<MemoryNodeId> {
        self.memory().find_element(self.container, tag)
    }

    /// Dispatches `event` on the first element with `tag`, returning how many
    /// listeners ran.
    pub fn dispatch(&self, tag: &str, event: &str) -> usize {
        match self.find(tag) {
            Some(node) => self.memory().dispatch_event(node, event),
            None => 0,
        }
    }

    pub fn take_ops(&mut self) -> Vec<HostOp<MemoryNodeId>> {
        self.root.host_mut().take_ops()
    }

    /// Labels of the recorded ops, draining the log.
    pub fn take_op_labels(&mut self) -> Vec<String> {
        self.take_ops().iter().map(HostOp::label).collect()
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}
