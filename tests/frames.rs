mod common;

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use spark_dom::dom::markup::{inner_html, parse_fragment};
use spark_dom::{
    AbortSignal, FrameError, FrameRequest, FrameResolver, Node, RenderError, RuntimeConfig, create_root, frame, h,
    text,
};

use common::{collect_errors, root, setup};

struct Pending {
    request: FrameRequest,
    signal: AbortSignal,
    respond: oneshot::Sender<Result<Node, FrameError>>,
}

type Requests = Rc<RefCell<Vec<Pending>>>;

/// A resolver whose responses the test sends by hand.
fn manual_resolver(requests: &Requests) -> Rc<dyn FrameResolver> {
    let requests = requests.clone();
    Rc::new(
        move |request: FrameRequest, signal: AbortSignal| -> LocalBoxFuture<'static, Result<Node, FrameError>> {
            let (respond, response) = oneshot::channel();
            let src = request.src.to_string();
            requests.borrow_mut().push(Pending { request, signal, respond });
            async move { response.await.unwrap_or(Err(FrameError::Aborted { src })) }.boxed_local()
        },
    )
}

fn respond(requests: &Requests, src: &str, result: Result<Node, FrameError>) {
    let index = requests
        .borrow()
        .iter()
        .position(|p| &*p.request.src == src)
        .expect("request was made");
    let pending = requests.borrow_mut().remove(index);
    let _ = pending.respond.send(result);
}

fn config(requests: &Requests) -> RuntimeConfig {
    RuntimeConfig::default().with_frame_resolver(manual_resolver(requests))
}

fn page(src: &str, fallback: &str) -> Node {
    h("div").child(frame(src).fallback(text(fallback))).build()
}

#[test]
fn test_fallback_then_resolved_content() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/inbox", "loading"));
    assert_eq!(inner_html(&container), "<div><!-- rmx:f:0 -->loading<!-- /rmx:f --></div>");
    assert_eq!(
        requests.borrow()[0].request,
        FrameRequest {
            src: "/inbox".into(),
            name: None
        }
    );

    respond(&requests, "/inbox", Ok(h("p").child(text("3 messages")).build()));
    root.settle();
    assert_eq!(inner_html(&container), "<div><!-- rmx:f:0 --><p>3 messages</p><!-- /rmx:f --></div>");
}

#[test]
fn test_frame_name_is_passed_to_resolver() {
    let requests = Requests::default();
    let (_doc, _container, root) = root(config(&requests));

    root.render(frame("/sidebar").name("nav"));
    assert_eq!(requests.borrow()[0].request.name.as_deref(), Some("nav"));
}

#[test]
fn test_source_change_before_resolution_replaces_frame() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/a", "loading a"));
    root.render(page("/b", "loading b"));

    assert!(requests.borrow()[0].signal.aborted());
    assert_eq!(inner_html(&container), "<div><!-- rmx:f:1 -->loading b<!-- /rmx:f --></div>");

    // The superseded response is ignored.
    respond(&requests, "/a", Ok(text("A")));
    root.settle();
    assert_eq!(container.text_content(), "loading b");

    respond(&requests, "/b", Ok(text("B")));
    root.settle();
    assert_eq!(container.text_content(), "B");
}

#[test]
fn test_source_change_after_resolution_updates_in_place() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/a", "loading"));
    respond(&requests, "/a", Ok(h("p").child(text("A")).build()));
    root.settle();
    let p = container.first_child().unwrap().children()[1].clone();

    root.render(page("/b", "loading"));
    // Markers and content stay until the new content arrives.
    assert_eq!(container.text_content(), "A");

    respond(&requests, "/b", Ok(h("p").child(text("B")).build()));
    root.settle();
    assert_eq!(inner_html(&container), "<div><!-- rmx:f:0 --><p>B</p><!-- /rmx:f --></div>");
    assert_eq!(container.first_child().unwrap().children()[1], p);
}

#[test]
fn test_stale_resolution_is_dropped() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/a", "loading"));
    respond(&requests, "/a", Ok(text("A")));
    root.settle();

    root.render(page("/b", "loading"));
    root.render(page("/c", "loading"));
    let b_signal = requests.borrow()[0].signal.clone();
    assert!(b_signal.aborted());

    respond(&requests, "/b", Ok(text("B")));
    root.settle();
    assert_eq!(container.text_content(), "A");

    respond(&requests, "/c", Ok(text("C")));
    root.settle();
    assert_eq!(container.text_content(), "C");
}

#[test]
fn test_fallback_updates_while_unresolved() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/a", "loading"));
    let fallback = container.first_child().unwrap().children()[1].clone();
    root.render(page("/a", "still loading"));

    assert_eq!(fallback.data().as_deref(), Some("still loading"));
    assert_eq!(requests.borrow().len(), 1);
}

#[test]
fn test_resolver_error_is_reported_and_fallback_kept() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));
    let errors = collect_errors(&root);

    root.render(page("/broken", "loading"));
    respond(
        &requests,
        "/broken",
        Err(FrameError::Load {
            src: "/broken".into(),
            reason: "404".into(),
        }),
    );
    root.settle();

    assert_eq!(container.text_content(), "loading");
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], RenderError::Frame(FrameError::Load { reason, .. }) if reason == "404"));
}

#[test]
fn test_removing_pending_frame_aborts_and_clears_markers() {
    let requests = Requests::default();
    let (_doc, container, root) = root(config(&requests));

    root.render(page("/a", "loading"));
    root.render(h("div"));

    assert!(requests.borrow()[0].signal.aborted());
    assert_eq!(inner_html(&container), "<div></div>");

    respond(&requests, "/a", Ok(text("late")));
    root.settle();
    assert_eq!(inner_html(&container), "<div></div>");
}

#[test]
fn test_without_resolver_fallback_stays() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(page("/a", "loading"));
    root.settle();
    assert_eq!(container.text_content(), "loading");
}

#[test]
fn test_hydrated_frame_adopts_server_content() {
    let requests = Requests::default();
    let (doc, container) = setup();
    for node in parse_fragment(&doc, "<div><!-- rmx:f:7 --><p>server</p><!-- /rmx:f --></div>") {
        container.append_child(&node);
    }
    doc.take_mutations();
    let server_p = container.first_child().unwrap().children()[1].clone();

    let root = create_root(&doc, &container, config(&requests));
    root.hydrate(page("/a", "loading"));
    // No fallback rendered over the server content.
    assert_eq!(doc.mutation_count(), 0);

    respond(&requests, "/a", Ok(h("p").child(text("server")).build()));
    root.settle();
    assert_eq!(doc.mutation_count(), 0);
    assert_eq!(container.first_child().unwrap().children()[1], server_p);
}
