mod common;

use spark_dom::{DomNode, Event, PropValue, RuntimeConfig, h};

use common::root;

fn value(node: &DomNode) -> Option<String> {
    node.get_property("value").as_str().map(str::to_string)
}

/// What a user typing into `input` does to it.
fn type_into(input: &DomNode, text: &str) {
    input.set_property("value", text.into());
    input.dispatch_event(&Event::new("input"));
}

#[test]
fn test_typed_value_is_restored_after_microtasks() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("value", "a"));
    let input = container.first_child().unwrap();

    type_into(&input, "x");
    assert_eq!(value(&input).as_deref(), Some("x"));

    root.run_microtasks();
    assert_eq!(value(&input).as_deref(), Some("a"));
}

#[test]
fn test_restore_uses_the_latest_prop() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("value", "a"));
    root.render(h("input").prop("value", "b"));
    let input = container.first_child().unwrap();
    assert_eq!(value(&input).as_deref(), Some("b"));

    type_into(&input, "y");
    root.settle();
    assert_eq!(value(&input).as_deref(), Some("b"));
}

#[test]
fn test_uncontrolled_input_keeps_typed_value() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("name", "q"));
    let input = container.first_child().unwrap();

    type_into(&input, "typed");
    root.settle();
    assert_eq!(value(&input).as_deref(), Some("typed"));
}

#[test]
fn test_dropping_the_value_prop_releases_control() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("value", "a"));
    root.render(h("input"));
    let input = container.first_child().unwrap();

    type_into(&input, "free");
    root.settle();
    assert_eq!(value(&input).as_deref(), Some("free"));
    assert_eq!(input.listener_count("input"), 0);
}

#[test]
fn test_checked_is_restored_on_change() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("type", "checkbox").prop("checked", true));
    let input = container.first_child().unwrap();

    input.set_property("checked", PropValue::Bool(false));
    input.dispatch_event(&Event::new("change"));
    root.run_microtasks();
    assert_eq!(input.get_property("checked").as_bool(), Some(true));
}

#[test]
fn test_removal_cancels_queued_restore() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("input").prop("value", "a"));
    let input = container.first_child().unwrap();

    type_into(&input, "x");
    root.render(h("p"));
    root.run_microtasks();

    assert!(!input.is_connected());
    assert_eq!(value(&input).as_deref(), Some("x"));
    assert_eq!(input.listener_count("input"), 0);
}
