use super::*;
use crate::element::{component, h, text, Component, Element, EventHandler, Props};
use crate::hooks::{use_effect, use_state, EffectResult, StateSetter};
use crate::host::{MemoryHost, MemoryNodeId};
use crate::deps;
use std::cell::RefCell;

/// Delegates to a [`MemoryHost`] and logs every mutation.
#[derive(Default)]
struct LoggedHost {
    inner: MemoryHost,
    ops: Vec<String>,
    fail_next_set: bool,
}

impl LoggedHost {
    fn take_ops(&mut self) -> Vec<String> {
        mem::take(&mut self.ops)
    }
}

impl Host for LoggedHost {
    type Handle = MemoryNodeId;

    fn create_element(&mut self, tag: &str) -> Result<MemoryNodeId, HostError> {
        self.ops.push(format!("create {tag}"));
        self.inner.create_element(tag)
    }

    fn create_text(&mut self, value: &str) -> Result<MemoryNodeId, HostError> {
        self.ops.push(format!("create '{value}'"));
        self.inner.create_text(value)
    }

    fn set_attribute(
        &mut self,
        node: &MemoryNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        if mem::take(&mut self.fail_next_set) {
            return Err(HostError::Unsupported {
                operation: "set_attribute",
                node: node.to_string(),
            });
        }
        self.ops.push(format!("set {name}={value}"));
        self.inner.set_attribute(node, name, value)
    }

    fn remove_attribute(&mut self, node: &MemoryNodeId, name: &str) -> Result<(), HostError> {
        self.ops.push(format!("unset {name}"));
        self.inner.remove_attribute(node, name)
    }

    fn add_event_listener(
        &mut self,
        node: &MemoryNodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.ops.push(format!("listen {event}"));
        self.inner.add_event_listener(node, event, handler)
    }

    fn remove_event_listener(
        &mut self,
        node: &MemoryNodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.ops.push(format!("unlisten {event}"));
        self.inner.remove_event_listener(node, event, handler)
    }

    fn insert_before(
        &mut self,
        parent: &MemoryNodeId,
        child: &MemoryNodeId,
        anchor: Option<&MemoryNodeId>,
    ) -> Result<(), HostError> {
        self.ops.push(match anchor {
            Some(_) => "insert before".to_owned(),
            None => "append".to_owned(),
        });
        self.inner.insert_before(parent, child, anchor)
    }

    fn remove_child(&mut self, parent: &MemoryNodeId, child: &MemoryNodeId) -> Result<(), HostError> {
        self.ops.push("remove".to_owned());
        self.inner.remove_child(parent, child)
    }
}

fn mount(element: Element) -> (FiberRoot<LoggedHost>, MemoryNodeId) {
    let mut host = LoggedHost::default();
    let container = host.inner.create_container();
    let mut root = FiberRoot::new(host);
    root.render(element, container);
    root.flush().unwrap();
    root.host_mut().take_ops();
    (root, container)
}

fn rerender(root: &mut FiberRoot<LoggedHost>, container: MemoryNodeId, element: Element) -> CommitReport {
    root.render(element, container);
    root.flush().unwrap().remove(0)
}

thread_local! {
    static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
    static SET_N: RefCell<Option<StateSetter<i64>>> = RefCell::new(None);
}

fn log_event(entry: String) {
    LOG.with(|log| log.borrow_mut().push(entry));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| mem::take(&mut *log.borrow_mut()))
}

fn tracked(props: &Props) -> Element {
    let name = props.get_str("name").unwrap_or("?").to_owned();
    let version = props.get_int("version").unwrap_or_default();
    let label = name.clone();
    use_effect(
        move || {
            log_event(format!("effect {label}"));
            EffectResult::new(move || log_event(format!("cleanup {label}")))
        },
        Some(deps![version]),
    );
    h("li").child(text(name)).build()
}

fn passthrough(props: &Props) -> Element {
    props.children()[0].clone()
}

fn group(props: &Props) -> Element {
    h("section").children(props.children().to_vec()).build()
}

const TRACKED: Component = Component::new("Tracked", tracked);

fn item(name: &str, version: i64) -> Element {
    component(TRACKED)
        .attr("name", name)
        .attr("version", version)
        .build()
}

#[test]
fn type_change_removes_old_node_before_inserting_new_one() {
    let (mut root, container) = mount(h("div").child(h("p").child("a")).child(h("i")).build());
    let report = rerender(
        &mut root,
        container,
        h("div").child(h("b").child("a")).child(h("i")).build(),
    );
    assert_eq!(report.deletions, 1);
    assert_eq!(report.placements, 2);
    assert_eq!(
        root.host_mut().take_ops(),
        ["remove", "create b", "insert before", "create 'a'", "append"]
    );
    assert_eq!(root.host().inner.to_markup(container), "<div><b>a</b><i></i></div>");
}

#[test]
fn attribute_diff_runs_in_removal_then_addition_order() {
    let keep = EventHandler::new(|_| {});
    let (mut root, container) = mount(
        h("button")
            .attr("id", "go")
            .attr("title", "old")
            .handler("click", keep.clone())
            .on("hover", |_| {})
            .build(),
    );
    let report = rerender(
        &mut root,
        container,
        h("button")
            .attr("title", "new")
            .attr("role", "button")
            .handler("click", keep)
            .on("hover", |_| {})
            .build(),
    );
    assert_eq!(
        root.host_mut().take_ops(),
        [
            "unlisten hover",
            "unset id",
            "set title=new",
            "set role=button",
            "listen hover",
        ]
    );
    assert_eq!(report.updates, 1);
    assert_eq!(report.attribute_updates, 3);
    assert_eq!(report.listener_updates, 2);
    let button = root.host().inner.find_element(container, "button").unwrap();
    assert_eq!(root.host().inner.listener_count(button, "click"), 1);
    assert_eq!(root.host().inner.listener_count(button, "hover"), 1);
}

#[test]
fn placement_anchors_through_handle_less_components() {
    let pass = Component::new("Pass", passthrough);
    let (mut root, container) = mount(
        h("ul")
            .child(component(pass).child(h("p")))
            .child(item("c", 0))
            .build(),
    );
    rerender(
        &mut root,
        container,
        h("ul")
            .child(component(pass).child(h("hr")))
            .child(item("c", 0))
            .build(),
    );
    assert_eq!(
        root.host_mut().take_ops(),
        ["remove", "create hr", "insert before"]
    );
    assert_eq!(
        root.host().inner.to_markup(container),
        "<ul><hr></hr><li>c</li></ul>"
    );
}

#[test]
fn deleting_a_component_removes_its_host_nodes_and_runs_cleanups() {
    let (mut root, container) = mount(
        h("ul")
            .child(item("a", 0))
            .child(component(Component::new("Group", group)).child(item("b", 0)))
            .build(),
    );
    assert_eq!(take_log(), ["effect a", "effect b"]);

    let report = rerender(&mut root, container, h("ul").child(item("a", 0)).build());
    assert_eq!(report.deletions, 1);
    assert_eq!(take_log(), ["cleanup b"]);
    assert_eq!(root.host().inner.to_markup(container), "<ul><li>a</li></ul>");
    assert_eq!(root.host_mut().take_ops(), ["remove"]);
}

#[test]
fn effects_rerun_only_when_deps_change() {
    let (mut root, container) = mount(h("ul").child(item("a", 1)).child(item("b", 1)).build());
    take_log();

    let report = rerender(&mut root, container, h("ul").child(item("a", 1)).child(item("b", 1)).build());
    assert_eq!(report.effects_run, 0);
    assert!(take_log().is_empty());

    let report = rerender(&mut root, container, h("ul").child(item("a", 1)).child(item("b", 2)).build());
    assert_eq!(report.effects_run, 1);
    assert_eq!(take_log(), ["cleanup b", "effect b"]);
}

#[test]
fn effects_run_children_before_parents() {
    fn outer(_: &Props) -> Element {
        use_effect(
            || {
                log_event("effect outer".to_owned());
                EffectResult::default()
            },
            None,
        );
        h("div").child(item("inner", 0)).build()
    }

    mount(component(Component::new("Outer", outer)).build());
    assert_eq!(take_log(), ["effect inner", "effect outer"]);
}

#[test]
fn host_failure_abandons_the_commit_pass() {
    let host = LoggedHost::default();
    let detached = 999;
    let mut root = FiberRoot::new(host);
    root.render(h("div").build(), detached);
    let err = root.flush().unwrap_err();
    assert!(matches!(err, RenderError::Host(HostError::Missing { .. })));
    assert!(root.work_in_progress().is_none());
    assert!(root.current_root().is_none());
}

fn numbered(_: &Props) -> Element {
    let (n, set_n) = use_state(|| 0i64);
    SET_N.with(|slot| *slot.borrow_mut() = Some(set_n));
    h("p").child(format!("n={n}")).build()
}

fn failing_commit(root: &mut FiberRoot<LoggedHost>) -> RenderError {
    root.host_mut().fail_next_set = true;
    let err = root.flush().unwrap_err();
    root.host_mut().take_ops();
    err
}

#[test]
fn failed_commit_leaves_state_uncommitted() {
    let (mut root, container) = mount(component(Component::new("Numbered", numbered)).build());
    let set_n = SET_N.with(|slot| slot.borrow().clone()).unwrap();

    set_n.set(1);
    let err = failing_commit(&mut root);
    assert!(matches!(err, RenderError::Host(HostError::Unsupported { .. })));
    assert_eq!(root.host().inner.text_content(container), "n=0");
    assert_eq!(set_n.committed(), 0);

    set_n.set(1);
    assert!(root.has_pending_work());
    let reports = root.flush().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(root.host().inner.text_content(container), "n=1");
    assert_eq!(set_n.committed(), 1);
}

#[test]
fn deletions_of_a_failed_commit_are_not_repeated() {
    let (mut root, container) = mount(
        h("div")
            .child(h("p").child("a"))
            .child(h("p").child("b"))
            .build(),
    );
    let next = || h("div").child(h("p").attr("x", 1i64).child("a")).build();

    root.render(next(), container);
    failing_commit(&mut root);
    assert_eq!(root.host().inner.to_markup(container), "<div><p>a</p></div>");

    let report = rerender(&mut root, container, next());
    assert_eq!(report.deletions, 0);
    assert_eq!(root.host_mut().take_ops(), ["set x=1"]);
    assert_eq!(
        root.host().inner.to_markup(container),
        "<div><p x=\"1\">a</p></div>"
    );
}

#[test]
fn insertions_of_a_failed_commit_are_undone() {
    let (mut root, container) = mount(
        h("main")
            .child(h("div").child(h("p").child("a")))
            .child(h("section"))
            .build(),
    );
    let next = || {
        h("main")
            .child(h("div").child(h("p").child("a")).child(h("i")))
            .child(h("section").attr("title", "t"))
            .build()
    };

    root.render(next(), container);
    failing_commit(&mut root);
    assert_eq!(
        root.host().inner.to_markup(container),
        "<main><div><p>a</p></div><section></section></main>"
    );

    let report = rerender(&mut root, container, next());
    assert_eq!(report.placements, 1);
    assert_eq!(root.host_mut().take_ops(), ["create i", "append", "set title=t"]);
    assert_eq!(
        root.host().inner.to_markup(container),
        "<main><div><p>a</p><i></i></div><section title=\"t\"></section></main>"
    );
}
