use std::cell::RefCell;

use fiber_testing::prelude::*;

thread_local! {
    static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
    static SET_TITLE: RefCell<Option<StateSetter<String>>> = RefCell::new(None);
}

fn record(entry: String) {
    LOG.with(|log| log.borrow_mut().push(entry));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| log.borrow_mut().drain(..).collect())
}

/// Effect keyed on the `a` and `b` props.
fn keyed(props: &Props) -> Element {
    let a = props.get_int("a").unwrap_or_default();
    let b = props.get_int("b").unwrap_or_default();
    use_effect(
        move || {
            record(format!("run {a},{b}"));
            EffectResult::new(move || record(format!("cleanup {a},{b}")))
        },
        Some(deps![a, b]),
    );
    text(format!("{a},{b}"))
}

fn keyed_element(a: i64, b: i64) -> Element {
    component(Component::new("Keyed", keyed))
        .attr("a", a)
        .attr("b", b)
        .build()
}

#[test]
fn unchanged_deps_do_not_refire() {
    let mut root = TestRoot::new();
    root.mount(keyed_element(1, 2));
    assert_eq!(take_log(), ["run 1,2"]);

    let report = root.mount(keyed_element(1, 2));
    assert_eq!(report.effects_run, 0);
    assert!(take_log().is_empty());
}

#[test]
fn changed_deps_refire_after_prior_cleanup() {
    let mut root = TestRoot::new();
    root.mount(keyed_element(1, 2));
    take_log();

    let report = root.mount(keyed_element(1, 3));
    assert_eq!(report.effects_run, 1);
    assert_eq!(take_log(), ["cleanup 1,2", "run 1,3"]);
}

#[test]
fn unmount_runs_the_last_cleanup() {
    let mut root = TestRoot::new();
    root.mount(h("main").child(keyed_element(4, 5)));
    take_log();

    root.mount(h("main"));
    assert_eq!(take_log(), ["cleanup 4,5"]);
    assert_eq!(root.markup(), "<main></main>");
}

/// Syncs its `title` state into the log after every commit that changed it.
fn titled(_: &Props) -> Element {
    let (title, set_title) = use_state(|| "draft".to_owned());
    SET_TITLE.with(|slot| *slot.borrow_mut() = Some(set_title.clone()));
    let synced = title.clone();
    use_effect(
        move || {
            record(format!("title {synced}"));
            if synced == "draft" {
                set_title.set("published".to_owned());
            }
            EffectResult::default()
        },
        Some(deps![title.clone()]),
    );
    h("title").child(title).build()
}

#[test]
fn state_set_from_an_effect_causes_a_follow_up_commit() {
    let mut root = TestRoot::new();
    root.render(component(Component::new("Titled", titled)));
    let reports = root.flush().expect("passes succeed");
    assert_eq!(reports.len(), 2);
    assert_eq!(take_log(), ["title draft", "title published"]);
    assert_eq!(root.markup(), "<title>published</title>");
}

#[test]
fn setting_the_same_string_is_a_no_op() {
    let mut root = TestRoot::new();
    root.render(component(Component::new("Titled", titled)));
    root.flush().expect("mount and follow-up pass");
    take_log();

    let setter = SET_TITLE
        .with(|slot| slot.borrow().clone())
        .expect("setter captured");
    setter.set("published".to_owned());
    assert!(!root.root().has_pending_work());
    assert!(root.flush().expect("nothing to do").is_empty());
}
