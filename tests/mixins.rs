mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use spark_dom::{
    AbortSignal, DomNode, Event, Mixin, MixinEventKind, MixinHandle, MixinResult, Node, Props, RuntimeConfig, fragment,
    h, node_ref, on, on_async, text,
};

use common::root;

type Log = Rc<RefCell<Vec<String>>>;

fn logging(name: &'static str, log: &Log) -> Mixin<()> {
    let log = log.clone();
    Mixin::new(name, move |handle: &MixinHandle, _host: &str| {
        for kind in [MixinEventKind::Insert, MixinEventKind::Remove, MixinEventKind::Reclaimed] {
            let log = log.clone();
            handle.add_event_listener(kind, move |_| log.borrow_mut().push(format!("{name}:{kind:?}")));
        }
        |_: &(), _: &Props| MixinResult::None
    })
}

#[test]
fn test_swapping_mixins_recreates_only_that_position() {
    let (_doc, _container, root) = root(RuntimeConfig::default());
    let log: Log = Rc::default();
    let a = logging("A", &log);
    let b = logging("B", &log);

    root.render(h("div").mix([a.with(()), b.with(())]));
    assert_eq!(*log.borrow(), ["A:Insert", "B:Insert"]);

    log.borrow_mut().clear();
    root.render(h("div").mix([a.with(())]));
    assert_eq!(*log.borrow(), ["B:Remove"]);

    log.borrow_mut().clear();
    root.render(h("div").mix([b.with(())]));
    assert_eq!(*log.borrow(), ["A:Remove", "B:Insert"]);

    log.borrow_mut().clear();
    root.render(h("p"));
    assert_eq!(*log.borrow(), ["B:Remove"]);
}

#[test]
fn test_runner_state_survives_rerender() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let counter = Mixin::new("counter", |handle: &MixinHandle, _host: &str| {
        let handle = handle.clone();
        let renders = Cell::new(0);
        move |_: &(), _: &Props| {
            renders.set(renders.get() + 1);
            MixinResult::Node(handle.element().prop("data-renders", renders.get()).build())
        }
    });

    for _ in 0..3 {
        root.render(h("div").mix([counter.with(())]));
    }
    let div = container.first_child().unwrap();
    assert_eq!(div.get_attribute("data-renders").as_deref(), Some("3"));
}

#[test]
fn test_composed_props_reach_the_dom() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let active = Mixin::new("active", |handle: &MixinHandle, _host: &str| {
        let handle = handle.clone();
        move |enabled: &bool, _: &Props| {
            if *enabled {
                MixinResult::Node(handle.element().class("active").build())
            } else {
                MixinResult::None
            }
        }
    });

    root.render(h("button").class("btn").mix([active.with(true)]).child(text("go")));
    let button = container.first_child().unwrap();
    assert_eq!(button.get_attribute("class").as_deref(), Some("active"));

    root.render(h("button").class("btn").mix([active.with(false)]).child(text("go")));
    assert_eq!(button.get_attribute("class").as_deref(), Some("btn"));
}

#[test]
fn test_on_uses_the_latest_handler() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let clicks: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let button = |label: &'static str| -> Node {
        let clicks = clicks.clone();
        h("button").mix([on("click", move |_| clicks.borrow_mut().push(label))]).build()
    };

    root.render(button("first"));
    let dom = container.first_child().unwrap();
    dom.dispatch_event(&Event::new("click"));

    root.render(button("second"));
    dom.dispatch_event(&Event::new("click"));
    assert_eq!(*clicks.borrow(), ["first", "second"]);
    assert_eq!(dom.listener_count("click"), 1);

    root.render(h("button"));
    dom.dispatch_event(&Event::new("click"));
    assert_eq!(clicks.borrow().len(), 2);
    assert_eq!(dom.listener_count("click"), 0);
}

#[test]
fn test_on_async_aborts_previous_invocation() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let signals: Rc<RefCell<Vec<AbortSignal>>> = Rc::default();
    let sink = signals.clone();
    root.render(h("form").mix([on_async("submit", move |_, signal| {
        sink.borrow_mut().push(signal);
        futures::future::pending().boxed_local()
    })]));

    let form = container.first_child().unwrap();
    form.dispatch_event(&Event::new("submit"));
    form.dispatch_event(&Event::new("submit"));
    root.settle();

    let signals = signals.borrow();
    assert_eq!(signals.len(), 2);
    assert!(signals[0].aborted());
    assert!(!signals[1].aborted());
}

#[test]
fn test_node_ref_receives_node_and_lifetime_signal() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let seen: Rc<RefCell<Option<(DomNode, AbortSignal)>>> = Rc::default();
    let sink = seen.clone();
    root.render(h("canvas").mix([node_ref(move |node, signal| *sink.borrow_mut() = Some((node.clone(), signal)))]));

    let (node, signal) = seen.borrow().clone().expect("ref called on insert");
    assert_eq!(Some(node), container.first_child());
    assert!(!signal.aborted());

    root.render(h("p"));
    assert!(signal.aborted());
}

#[test]
fn test_update_future_resolves_after_commit() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let slot: Rc<RefCell<Option<MixinHandle>>> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    let tracked = {
        let (slot, renders) = (slot.clone(), renders.clone());
        Mixin::new("tracked", move |handle: &MixinHandle, _host: &str| {
            *slot.borrow_mut() = Some(handle.clone());
            let renders = renders.clone();
            move |_: &(), _: &Props| {
                renders.set(renders.get() + 1);
                MixinResult::None
            }
        })
    };
    root.render(h("div").mix([tracked.with(())]));
    assert_eq!(renders.get(), 1);

    let done = Rc::new(Cell::new(false));
    let update = slot.borrow().as_ref().unwrap().update();
    let flag = done.clone();
    root.event_loop().spawn(async move {
        update.await;
        flag.set(true);
    });
    root.settle();

    assert!(done.get());
    assert_eq!(renders.get(), 2);
    assert!(container.first_child().is_some());
}

#[test]
fn test_lifecycle_commit_fires_for_touched_nodes() {
    let (_doc, _container, root) = root(RuntimeConfig::default());
    let log: Log = Rc::default();
    let phases = {
        let log = log.clone();
        Mixin::new("phases", move |handle: &MixinHandle, _host: &str| {
            for kind in [MixinEventKind::BeforeUpdate, MixinEventKind::Commit] {
                let log = log.clone();
                handle.add_event_listener(kind, move |_| log.borrow_mut().push(format!("{kind:?}")));
            }
            |_: &(), _: &Props| MixinResult::None
        })
    };

    root.render(h("div").mix([phases.with(())]));
    log.borrow_mut().clear();
    root.render(h("div").mix([phases.with(())]));
    assert_eq!(*log.borrow(), ["BeforeUpdate", "Commit"]);
}

#[test]
fn test_node_ref_added_on_rerender_receives_node() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    root.render(h("div").mix([on("click", |_| {})]));

    let seen: Rc<RefCell<Option<DomNode>>> = Rc::default();
    let sink = seen.clone();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let descriptors = move || {
        let sink = sink.clone();
        let counter = counter.clone();
        [
            on("click", |_| {}),
            node_ref(move |node, _signal| {
                counter.set(counter.get() + 1);
                *sink.borrow_mut() = Some(node.clone());
            }),
        ]
    };
    root.render(h("div").mix(descriptors()));
    root.render(h("div").mix(descriptors()));

    assert_eq!(*seen.borrow(), container.first_child());
    assert_eq!(calls.get(), 1);
}

// =============================================================================
// Deferred removal
// =============================================================================

/// Controls for the `fade` mixin's pending teardowns.
#[derive(Default)]
struct Release {
    senders: RefCell<Vec<oneshot::Sender<()>>>,
    /// Signals handed to each teardown.
    teardown_signals: RefCell<Vec<AbortSignal>>,
    /// Each runner's node lifetime signal.
    node_signals: RefCell<Vec<AbortSignal>>,
}

impl Release {
    fn finish_all(&self) {
        for tx in self.senders.borrow_mut().drain(..) {
            let _ = tx.send(());
        }
    }
}

/// A mixin that keeps its node until the test releases it.
fn fade(release: &Rc<Release>, log: &Log) -> Mixin<()> {
    let (release, log) = (release.clone(), log.clone());
    Mixin::new("fade", move |handle: &MixinHandle, _host: &str| {
        release.node_signals.borrow_mut().push(handle.signal());
        let persist = handle.clone();
        let pending = release.clone();
        handle.add_event_listener(MixinEventKind::BeforeRemove, move |_| {
            let (tx, rx) = oneshot::channel();
            pending.senders.borrow_mut().push(tx);
            let signals = pending.clone();
            persist.persist_node(move |signal| {
                signals.teardown_signals.borrow_mut().push(signal);
                async move {
                    let _ = rx.await;
                }
                .boxed_local()
            });
        });
        let log_remove = log.clone();
        handle.add_event_listener(MixinEventKind::Remove, move |_| log_remove.borrow_mut().push("Remove".into()));
        let log_reclaim = log.clone();
        handle.add_event_listener(MixinEventKind::Reclaimed, move |_| {
            log_reclaim.borrow_mut().push("Reclaimed".into())
        });
        |_: &(), _: &Props| MixinResult::None
    })
}

fn item(key: &str, fade: &Mixin<()>) -> Node {
    h("li").key(key).mix([fade.with(())]).child(text(key)).build()
}

fn items(keys: &[&str], fade: &Mixin<()>) -> Node {
    h("ul").children(keys.iter().map(|k| item(k, fade))).build()
}

#[test]
fn test_persisted_node_stays_until_teardown_settles() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let release = Rc::new(Release::default());
    let log: Log = Rc::default();
    let fade = fade(&release, &log);

    root.render(items(&["a", "b"], &fade));
    root.render(items(&["b"], &fade));

    let ul = container.first_child().unwrap();
    assert_eq!(ul.text_content(), "ab");
    assert_eq!(root.persisted_count(), 1);

    // The live sibling did not move around the persisted one.
    root.render(items(&["b"], &fade));
    assert_eq!(ul.text_content(), "ab");

    release.finish_all();
    root.settle();

    assert_eq!(ul.text_content(), "b");
    assert_eq!(root.persisted_count(), 0);
    assert_eq!(*log.borrow(), ["Remove"]);
    assert!(release.node_signals.borrow()[0].aborted());
}

#[test]
fn test_persisted_node_is_reclaimed_by_key() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let release = Rc::new(Release::default());
    let log: Log = Rc::default();
    let fade = fade(&release, &log);

    root.render(items(&["a"], &fade));
    let li = container.first_child().unwrap().first_child().unwrap();

    root.render(items(&[], &fade));
    assert_eq!(root.persisted_count(), 1);
    assert!(!release.teardown_signals.borrow()[0].aborted());

    root.render(items(&["a"], &fade));
    assert_eq!(root.persisted_count(), 0);
    assert_eq!(container.first_child().unwrap().first_child(), Some(li.clone()));
    assert_eq!(*log.borrow(), ["Reclaimed"]);

    // The pending teardown is cancelled; the node itself lives on.
    assert!(release.teardown_signals.borrow()[0].aborted());
    assert!(!release.node_signals.borrow()[0].aborted());

    // The stale teardown finishing later must not remove the reclaimed node.
    release.finish_all();
    root.settle();
    assert!(li.is_connected());
}

#[test]
fn test_reclaim_inside_new_fragment_keeps_order() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let release = Rc::new(Release::default());
    let log: Log = Rc::default();
    let fade = fade(&release, &log);

    root.render(items(&["a", "b"], &fade));
    let a = container.first_child().unwrap().first_child().unwrap();
    root.render(items(&["b"], &fade));
    assert_eq!(root.persisted_count(), 1);

    root.render(h("ul").children([
        fragment([item("a", &fade), h("li").child(text("z")).build()]),
        item("b", &fade),
    ]));

    let ul = container.first_child().unwrap();
    assert_eq!(ul.text_content(), "azb");
    assert_eq!(ul.first_child(), Some(a));
    assert_eq!(*log.borrow(), ["Reclaimed"]);
}

#[test]
fn test_unmount_finalizes_persisted_nodes() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let release = Rc::new(Release::default());
    let log: Log = Rc::default();
    let fade = fade(&release, &log);

    root.render(items(&["a", "b"], &fade));
    root.render(items(&["a"], &fade));
    assert_eq!(root.persisted_count(), 1);

    root.unmount();
    assert!(container.first_child().is_none());
    assert_eq!(log.borrow().iter().filter(|e| *e == "Remove").count(), 2);
}
