use super::*;
use crate::element::text;
use crate::host::MemoryHost;

fn page(title: &str) -> Element {
    h("div")
        .attr("class", "page")
        .child(h("h1").child(text(title.to_owned())))
        .child(h("p").child("body"))
        .build()
}

#[test]
fn render_materializes_only_after_commit() {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = FiberRoot::new(host);

    root.render(page("Hello"), container);
    assert!(root.has_pending_work());
    assert!(root.host().children(container).is_empty());

    let reports = root.flush().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].placements, 5);
    assert_eq!(
        root.host().to_markup(container),
        "<div class=\"page\"><h1>Hello</h1><p>body</p></div>"
    );
    assert!(!root.has_pending_work());
    assert!(root.current_root().is_some());
    assert!(root.work_in_progress().is_none());
}

#[test]
fn rerendering_identical_description_is_a_no_op_diff() {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = FiberRoot::new(host);
    root.render(page("Same"), container);
    root.flush().unwrap();

    root.render(page("Same"), container);
    let reports = root.flush().unwrap();
    let report = &reports[0];
    assert_eq!(report.placements, 0);
    assert_eq!(report.deletions, 0);
    assert_eq!(report.updates, 0);
    assert_eq!(report.attribute_updates, 0);
    assert_eq!(report.listener_updates, 0);
    assert_eq!(report.unchanged, 5);
}

#[test]
fn changed_text_updates_in_place() {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = FiberRoot::new(host);
    root.render(page("One"), container);
    root.flush().unwrap();
    let h1 = root.host().find_element(container, "h1").unwrap();
    let leaf = root.host().children(h1)[0];

    root.render(page("Two"), container);
    let report = root.flush().unwrap().remove(0);
    assert_eq!(report.updates, 1);
    assert_eq!(report.attribute_updates, 1);
    assert_eq!(root.host().children(h1), [leaf]);
    assert_eq!(root.host().text_content(container), "Twobody");
}

#[test]
fn committed_tree_is_reclaimed_after_each_commit() {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = FiberRoot::new(host);
    root.render(page("A"), container);
    root.flush().unwrap();
    let live = root.tree().len();

    root.render(page("B"), container);
    let report = root.flush().unwrap().remove(0);
    assert_eq!(report.reclaimed, live);
    assert_eq!(root.tree().len(), live);
}

#[test]
fn rendering_into_another_container_starts_from_scratch() {
    let mut host = MemoryHost::new();
    let first = host.create_container();
    let second = host.create_container();
    let mut root = FiberRoot::new(host);
    root.render(page("A"), first);
    root.flush().unwrap();

    root.render(page("B"), second);
    let report = root.flush().unwrap().remove(0);
    assert_eq!(report.placements, 5);
    assert_eq!(root.host().text_content(second), "Bbody");
}

#[test]
fn flush_without_work_is_idle() {
    let mut root = FiberRoot::new(MemoryHost::new());
    assert!(root.flush().unwrap().is_empty());
}
