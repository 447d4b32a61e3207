mod common;

use std::collections::HashMap;

use proptest::prelude::*;
use spark_dom::{ComponentType, DomNode, Node, Props, RuntimeConfig, component, fragment, h, keyed_component, keyed_fragment, props, text};

use common::{child_texts, root};

fn keyed_list(keys: &[&str]) -> Node {
    h("ul")
        .children(keys.iter().map(|k| h("li").key(*k).child(text(*k))))
        .build()
}

fn list(container: &DomNode) -> DomNode {
    container.first_child().expect("list rendered")
}

#[test]
fn test_reorder_moves_one_node() {
    let (doc, container, root) = root(RuntimeConfig::default());
    root.render(keyed_list(&["a", "b", "c", "d"]));
    let before = list(&container).children();
    doc.take_mutations();

    root.render(keyed_list(&["d", "a", "b", "c"]));

    let ul = list(&container);
    assert_eq!(child_texts(&ul), ["d", "a", "b", "c"]);
    assert_eq!(ul.children(), [before[3].clone(), before[0].clone(), before[1].clone(), before[2].clone()]);
    // One move: out of the list and back in.
    assert_eq!(doc.mutation_count(), 2);
}

#[test]
fn test_adjacent_swap() {
    let (doc, container, root) = root(RuntimeConfig::default());
    root.render(keyed_list(&["a", "b", "c", "d"]));
    doc.take_mutations();

    root.render(keyed_list(&["a", "c", "b", "d"]));
    assert_eq!(child_texts(&list(&container)), ["a", "c", "b", "d"]);
    assert_eq!(doc.mutation_count(), 2);
}

#[test]
fn test_identical_render_writes_nothing() {
    let (doc, _container, root) = root(RuntimeConfig::default());
    root.render(keyed_list(&["a", "b", "c"]));
    doc.take_mutations();

    root.render(keyed_list(&["a", "b", "c"]));
    assert_eq!(doc.mutation_count(), 0);
}

#[test]
fn test_insert_and_remove_keep_survivors() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(keyed_list(&["a", "b", "c"]));
    let before = list(&container).children();

    root.render(keyed_list(&["c", "x", "a"]));

    let ul = list(&container);
    assert_eq!(child_texts(&ul), ["c", "x", "a"]);
    assert_eq!(ul.children()[0], before[2]);
    assert_eq!(ul.children()[2], before[0]);
    assert!(before[1].parent().is_none());
}

#[test]
fn test_unkeyed_children_reuse_by_position() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("div").children([h("p").child(text("one")), h("span").child(text("two"))]));
    let before = list(&container).children();

    root.render(h("div").children([h("p").child(text("uno")), h("em").child(text("dos"))]));

    let div = list(&container);
    assert_eq!(div.children()[0], before[0]);
    assert_ne!(div.children()[1], before[1]);
    assert_eq!(div.children()[1].tag_name().as_deref(), Some("em"));
    assert_eq!(child_texts(&div), ["uno", "dos"]);
}

#[test]
fn test_unkeyed_shrink_and_grow() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("div").children(["a", "b", "c"].map(text)));
    root.render(h("div").children(["a"].map(text)));
    assert_eq!(list(&container).text_content(), "a");

    root.render(h("div").children(["a", "b", "c", "d"].map(text)));
    assert_eq!(list(&container).text_content(), "abcd");
}

#[test]
fn test_keyed_fragments_move_as_ranges() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let pair = |k: &str| keyed_fragment(k, [text(format!("{k}1")), text(format!("{k}2"))]);

    root.render(h("div").children([pair("a"), pair("b"), pair("c")]));
    root.render(h("div").children([pair("c"), pair("a"), pair("b")]));

    assert_eq!(child_texts(&list(&container)), ["c1", "c2", "a1", "a2", "b1", "b2"]);
}

#[test]
fn test_nested_fragment_inside_list() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("div").children([text("start"), fragment([text("x"), text("y")]), text("end")]));
    root.render(h("div").children([text("start"), fragment([text("y")]), text("end")]));

    assert_eq!(child_texts(&list(&container)), ["start", "y", "end"]);
}

#[test]
fn test_keyed_components_keep_their_dom() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let item = ComponentType::stateless("Item", |p| {
        let label = p.get("label").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        h("li").child(text(label)).build()
    });
    let render = |keys: &[&str]| {
        h("ul")
            .children(keys.iter().map(|k| keyed_component(*k, &item, props([("label", *k)]))))
            .build()
    };

    root.render(render(&["a", "b", "c"]));
    let before = list(&container).children();
    root.render(render(&["b", "c", "a"]));

    let ul = list(&container);
    assert_eq!(child_texts(&ul), ["b", "c", "a"]);
    assert_eq!(ul.children(), [before[1].clone(), before[2].clone(), before[0].clone()]);
}

#[test]
fn test_component_type_change_replaces() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let first = ComponentType::stateless("First", |_| h("b").child(text("first")).build());
    let second = ComponentType::stateless("Second", |_| h("i").child(text("second")).build());

    root.render(h("div").child(component(&first, Props::new())));
    root.render(h("div").child(component(&second, Props::new())));

    assert_eq!(list(&container).children().len(), 1);
    assert_eq!(list(&container).text_content(), "second");
}

#[test]
fn test_duplicate_keys_render_every_child() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let dupes = |labels: [&str; 3]| {
        h("ul")
            .children([
                h("li").key("k").child(text(labels[0])),
                h("li").key("k").child(text(labels[1])),
                h("li").key("z").child(text(labels[2])),
            ])
            .build()
    };
    root.render(dupes(["1", "2", "3"]));
    root.render(dupes(["4", "5", "6"]));
    assert_eq!(child_texts(&list(&container)), ["4", "5", "6"]);
}

fn key_lists() -> impl Strategy<Value = Vec<u8>> {
    proptest::sample::subsequence((0u8..10).collect::<Vec<_>>(), 0..=10).prop_shuffle()
}

proptest! {
    #[test]
    fn test_keyed_diff_matches_any_permutation(old in key_lists(), new in key_lists()) {
        let (_doc, container, root) = root(RuntimeConfig::default());
        let render = |keys: &[u8]| {
            h("ul")
                .children(keys.iter().map(|k| h("li").key(u32::from(*k)).child(text(k.to_string()))))
                .build()
        };

        root.render(render(&old));
        let before: HashMap<String, DomNode> = list(&container)
            .children()
            .into_iter()
            .map(|li| (li.text_content(), li))
            .collect();

        root.render(render(&new));

        let ul = list(&container);
        let expected: Vec<String> = new.iter().map(u8::to_string).collect();
        prop_assert_eq!(child_texts(&ul), expected);
        for li in ul.children() {
            if let Some(previous) = before.get(&li.text_content()) {
                prop_assert_eq!(previous, &li);
            }
        }
        prop_assert_eq!(root.instance_count(), 1 + 2 * new.len());
    }
}
