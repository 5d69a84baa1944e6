//! Immutable tree descriptions produced by application code.

use std::any::Any;
use std::fmt;
use std::ptr;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::same_value::SameValue;

/// Attribute names starting with this marker are event bindings.
pub const EVENT_PREFIX: &str = "on";

/// Attribute holding the literal text of a text leaf.
pub const TEXT_VALUE: &str = "nodeValue";

pub type RenderFn = fn(&Props) -> Element;

/// A function component. Two components are the same type when they share a
/// name and a render function.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
}

impl Component {
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn render(&self, props: &Props) -> Element {
        (self.render)(props)
    }

    /// Function addresses are not unique: identical bodies may share one, and
    /// one function may get several. The name separates merged functions; a
    /// function seen under two addresses is remounted instead of updated.
    pub fn same_component(&self, other: &Component) -> bool {
        self.name == other.name && ptr::fn_addr_eq(self.render, other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// Payload handed to event listeners by the host.
#[derive(Clone)]
pub struct Event {
    name: Rc<str>,
    payload: Option<Rc<dyn Any>>,
}

impl Event {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(name: impl Into<Rc<str>>, payload: Rc<dyn Any>) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Callback-valued attribute. Identity is the allocation, so re-creating a
/// closure on every render produces a "changed" binding.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl SameValue for EventHandler {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

#[derive(Clone)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
    Any(Rc<dyn Any>),
}

impl PropValue {
    pub fn any<T: 'static>(value: T) -> Self {
        PropValue::Any(Rc::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            PropValue::Any(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl SameValue for PropValue {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.same_value(b),
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a.same_value(b),
            (PropValue::Any(a), PropValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => write!(f, "{value:?}"),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Handler(handler) => handler.fmt(f),
            PropValue::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.write_str(value),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Handler(_) => f.write_str("[handler]"),
            PropValue::Any(_) => f.write_str("[value]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

pub fn is_event_attribute(name: &str) -> bool {
    name.len() > EVENT_PREFIX.len() && name.starts_with(EVENT_PREFIX)
}

/// `onClick` -> `click`.
pub fn event_name(attribute: &str) -> String {
    attribute[EVENT_PREFIX.len()..].to_ascii_lowercase()
}

/// Named attributes plus the ordered child descriptions.
#[derive(Clone, Default)]
pub struct Props {
    attributes: IndexMap<Rc<str>, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    pub fn get_any<T: 'static>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(PropValue::downcast_ref::<T>)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attributes.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[derive(Clone, Debug)]
pub enum ElementType {
    Host(Rc<str>),
    Text,
    Component(Component),
}

impl ElementType {
    pub fn same_type(&self, other: &ElementType) -> bool {
        match (self, other) {
            (ElementType::Host(a), ElementType::Host(b)) => a == b,
            (ElementType::Text, ElementType::Text) => true,
            (ElementType::Component(a), ElementType::Component(b)) => a.same_component(b),
            _ => false,
        }
    }
}

struct ElementData {
    kind: ElementType,
    props: Props,
}

/// One node of a tree description. Cloning shares the underlying data.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    pub fn new(kind: ElementType, props: Props) -> Self {
        Self(Rc::new(ElementData { kind, props }))
    }

    pub fn kind(&self) -> &ElementType {
        &self.0.kind
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn children(&self) -> &[Element] {
        self.0.props.children()
    }

    pub fn text_value(&self) -> Option<&str> {
        match self.kind() {
            ElementType::Text => self.props().get_str(TEXT_VALUE),
            _ => None,
        }
    }

    pub fn same_type(&self, other: &Element) -> bool {
        self.kind().same_type(other.kind())
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Element");
        debug.field("kind", self.kind());
        if !self.props().is_empty() {
            debug.field("props", self.props());
        }
        if !self.children().is_empty() {
            debug.field("children", &self.children());
        }
        debug.finish()
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        text(value)
    }
}

#[must_use]
pub struct ElementBuilder {
    kind: ElementType,
    props: Props,
}

impl ElementBuilder {
    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.props.attributes.insert(name.into(), value.into());
        self
    }

    /// Binds `handler` to `event` (stored as the `on<event>` attribute).
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.handler(event, EventHandler::new(handler))
    }

    pub fn handler(self, event: &str, handler: EventHandler) -> Self {
        let name = format!("{EVENT_PREFIX}{event}");
        self.attr(name, handler)
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.props.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.props
            .children
            .extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Element {
        Element::new(self.kind, self.props)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

/// Starts a host element description.
pub fn h(tag: impl Into<Rc<str>>) -> ElementBuilder {
    ElementBuilder {
        kind: ElementType::Host(tag.into()),
        props: Props::default(),
    }
}

/// Starts a component description.
pub fn component(component: Component) -> ElementBuilder {
    ElementBuilder {
        kind: ElementType::Component(component),
        props: Props::default(),
    }
}

pub fn text(value: impl Into<Rc<str>>) -> Element {
    Element::new(
        ElementType::Text,
        Props::default().with(TEXT_VALUE, PropValue::Str(value.into())),
    )
}
