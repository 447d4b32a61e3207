//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use spark_dom::{Document, DomNode, RenderError, Root, RuntimeConfig, create_root};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness (`RUST_LOG=spark_dom=trace`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A document with a connected `<div id="app">` container.
pub fn setup() -> (Document, DomNode) {
    init_tracing();
    let doc = Document::new();
    let container = doc.create_element("div");
    container.set_attribute("id", "app");
    doc.body().append_child(&container);
    doc.take_mutations();
    (doc, container)
}

pub fn root(config: RuntimeConfig) -> (Document, DomNode, Root) {
    let (doc, container) = setup();
    let root = create_root(&doc, &container, config);
    (doc, container, root)
}

pub type Errors = Rc<RefCell<Vec<RenderError>>>;

/// Collect everything the root reports.
pub fn collect_errors(root: &Root) -> Errors {
    let errors: Errors = Rc::default();
    let sink = errors.clone();
    root.on_error(move |err| sink.borrow_mut().push(err.clone()));
    errors
}

/// Text content of each child of `node`.
pub fn child_texts(node: &DomNode) -> Vec<String> {
    node.children().iter().map(DomNode::text_content).collect()
}
