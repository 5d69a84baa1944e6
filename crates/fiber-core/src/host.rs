//! Host mutation interface consumed by the committer, plus an in-memory host.

use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::element::{Event, EventHandler, PropValue, TEXT_VALUE};
use crate::same_value::SameValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { node: String },
    NotAChild { parent: String, child: String },
    Unsupported { operation: &'static str, node: String },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { node } => write!(f, "host node {node} missing"),
            HostError::NotAChild { parent, child } => {
                write!(f, "host node {child} is not a child of {parent}")
            }
            HostError::Unsupported { operation, node } => {
                write!(f, "{operation} is not supported on host node {node}")
            }
        }
    }
}

impl std::error::Error for HostError {}

/// Primitive operations on the materialized host tree. Only the committer
/// calls these, and only during the commit phase.
pub trait Host {
    type Handle: Clone + PartialEq + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Result<Self::Handle, HostError>;
    fn create_text(&mut self, text: &str) -> Result<Self::Handle, HostError>;
    fn set_attribute(
        &mut self,
        node: &Self::Handle,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;
    fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), HostError>;
    fn add_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    fn remove_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    /// Inserts `child` before `anchor`, or appends when `anchor` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        anchor: Option<&Self::Handle>,
    ) -> Result<(), HostError>;
    fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle)
        -> Result<(), HostError>;
}

pub type MemoryNodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Container,
    Element(String),
    Text(String),
}

#[derive(Debug)]
pub struct MemoryNode {
    kind: MemoryNodeKind,
    attributes: IndexMap<String, PropValue>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<MemoryNodeId>,
    parent: Option<MemoryNodeId>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn kind(&self) -> &MemoryNodeKind {
        &self.kind
    }
}

/// Arena-backed host used by tests and headless rendering.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a detached container suitable as a render target.
    pub fn create_container(&mut self) -> MemoryNodeId {
        self.alloc(MemoryNode::new(MemoryNodeKind::Container))
    }

    fn alloc(&mut self, node: MemoryNode) -> MemoryNodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    pub fn node(&self, id: MemoryNodeId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| HostError::Missing {
                node: id.to_string(),
            })
    }

    fn node_mut(&mut self, id: MemoryNodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| HostError::Missing {
                node: id.to_string(),
            })
    }

    /// Number of live nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: MemoryNodeId) -> &[MemoryNodeId] {
        self.node(id).map(|node| &node.children[..]).unwrap_or(&[])
    }

    pub fn parent(&self, id: MemoryNodeId) -> Option<MemoryNodeId> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    pub fn attribute(&self, id: MemoryNodeId, name: &str) -> Option<&PropValue> {
        self.node(id).ok()?.attributes.get(name)
    }

    pub fn listener_count(&self, id: MemoryNodeId, event: &str) -> usize {
        self.node(id)
            .map(|node| node.listeners.iter().filter(|(name, _)| name == event).count())
            .unwrap_or(0)
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: MemoryNodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: MemoryNodeId, output: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        if let MemoryNodeKind::Text(text) = &node.kind {
            output.push_str(text);
        }
        for child in &node.children {
            self.collect_text(*child, output);
        }
    }

    /// Depth-first search for the first element with the given tag.
    pub fn find_element(&self, root: MemoryNodeId, tag: &str) -> Option<MemoryNodeId> {
        let node = self.node(root).ok()?;
        if matches!(&node.kind, MemoryNodeKind::Element(name) if name == tag) {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|child| self.find_element(*child, tag))
    }

    /// Invokes every listener bound to `event` on `id`, returning how many ran.
    ///
    /// Handlers are cloned out first so they may freely schedule updates.
    pub fn dispatch_event(&self, id: MemoryNodeId, event: &str) -> usize {
        let handlers: Vec<EventHandler> = match self.node(id) {
            Ok(node) => node
                .listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, handler)| handler.clone())
                .collect(),
            Err(_) => return 0,
        };
        let payload = Event::new(event);
        for handler in &handlers {
            handler.call(&payload);
        }
        handlers.len()
    }

    /// Serializes the children of `root` as compact markup.
    pub fn to_markup(&self, root: MemoryNodeId) -> String {
        let mut output = String::new();
        for child in self.children(root) {
            self.write_markup(*child, &mut output);
        }
        output
    }

    fn write_markup(&self, id: MemoryNodeId, output: &mut String) {
        let Ok(node) = self.node(id) else {
            output.push_str("<!missing>");
            return;
        };
        match &node.kind {
            MemoryNodeKind::Text(text) => output.push_str(text),
            MemoryNodeKind::Container => {
                for child in &node.children {
                    self.write_markup(*child, output);
                }
            }
            MemoryNodeKind::Element(tag) => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in &node.attributes {
                    let _ = write!(output, " {name}=\"{value}\"");
                }
                output.push('>');
                for child in &node.children {
                    self.write_markup(*child, output);
                }
                let _ = write!(output, "</{tag}>");
            }
        }
    }

    fn free_subtree(&mut self, id: MemoryNodeId) {
        let children = match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node.children,
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
    }
}

impl Host for MemoryHost {
    type Handle = MemoryNodeId;

    fn create_element(&mut self, tag: &str) -> Result<Self::Handle, HostError> {
        Ok(self.alloc(MemoryNode::new(MemoryNodeKind::Element(tag.to_owned()))))
    }

    fn create_text(&mut self, text: &str) -> Result<Self::Handle, HostError> {
        Ok(self.alloc(MemoryNode::new(MemoryNodeKind::Text(text.to_owned()))))
    }

    fn set_attribute(
        &mut self,
        node: &Self::Handle,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        match &mut target.kind {
            MemoryNodeKind::Text(text) if name == TEXT_VALUE => {
                *text = value.to_string();
                Ok(())
            }
            MemoryNodeKind::Element(_) => {
                target.attributes.insert(name.to_owned(), value.clone());
                Ok(())
            }
            _ => Err(HostError::Unsupported {
                operation: "set_attribute",
                node: node.to_string(),
            }),
        }
    }

    fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        target.attributes.shift_remove(name);
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        target.listeners.push((event.to_owned(), handler.clone()));
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        target
            .listeners
            .retain(|(name, bound)| !(name == event && bound.same_value(handler)));
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        anchor: Option<&Self::Handle>,
    ) -> Result<(), HostError> {
        if let Some(previous) = self.node(*child)?.parent {
            self.node_mut(previous)?.children.retain(|id| id != child);
        }
        let target = self.node_mut(*parent)?;
        let index = match anchor {
            Some(anchor) => target
                .children
                .iter()
                .position(|id| id == anchor)
                .ok_or_else(|| HostError::NotAChild {
                    parent: parent.to_string(),
                    child: anchor.to_string(),
                })?,
            None => target.children.len(),
        };
        target.children.insert(index, *child);
        self.node_mut(*child)?.parent = Some(*parent);
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*parent)?;
        let index = target
            .children
            .iter()
            .position(|id| id == child)
            .ok_or_else(|| HostError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })?;
        target.children.remove(index);
        self.free_subtree(*child);
        Ok(())
    }
}
