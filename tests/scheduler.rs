mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_dom::{
    Component, ComponentError, ComponentType, Node, Props, RenderError, Rendered, RuntimeConfig, ScheduleUpdate,
    Task, component, h, text,
};

use common::{collect_errors, root};

/// Test double: a component whose renders, failures and updater are
/// observable from outside.
#[derive(Clone, Default)]
struct Probe {
    renders: Rc<Cell<usize>>,
    fail: Rc<Cell<bool>>,
    /// Re-schedule itself from inside every render.
    runaway: Rc<Cell<bool>>,
    updater: Rc<RefCell<Option<ScheduleUpdate>>>,
    removed: Rc<Cell<bool>>,
    child: Option<ComponentType>,
}

impl Probe {
    fn schedule(&self) {
        let updater = self.updater.borrow().clone();
        updater.expect("mounted").schedule();
    }

    fn component_type(&self, name: &str) -> ComponentType {
        let probe = self.clone();
        ComponentType::new(name.to_string(), move || Box::new(probe.clone()) as Box<dyn Component>)
    }
}

impl Component for Probe {
    fn render(&mut self, _props: &Props) -> Result<Rendered, ComponentError> {
        if self.fail.get() {
            return Err(ComponentError::new("probe failure"));
        }
        self.renders.set(self.renders.get() + 1);
        if self.runaway.get() {
            self.schedule();
        }
        let label = format!("render {}", self.renders.get());
        let tree = match &self.child {
            Some(child) => h("section").child(text(label)).child(component(child, Props::new())).build(),
            None => h("span").child(text(label)).build(),
        };
        Ok(Rendered::new(tree))
    }

    fn set_schedule_update(&mut self, schedule: ScheduleUpdate) {
        *self.updater.borrow_mut() = Some(schedule);
    }

    fn remove(&mut self) -> Vec<Task> {
        let removed = self.removed.clone();
        vec![Box::new(move || removed.set(true))]
    }
}

#[test]
fn test_updates_batch_into_one_flush() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let probe = Probe::default();
    let ty = probe.component_type("Probe");
    root.render(component(&ty, Props::new()));

    probe.schedule();
    probe.schedule();
    probe.schedule();
    assert!(root.has_pending_updates());
    root.settle();

    assert_eq!(probe.renders.get(), 2);
    assert_eq!(container.text_content(), "render 2");
    assert!(!root.has_pending_updates());
}

#[test]
fn test_runaway_updates_hit_the_cascade_limit() {
    let (_doc, _container, root) = root(RuntimeConfig::default().with_max_cascade(50));
    let errors = collect_errors(&root);
    let probe = Probe::default();
    probe.runaway.set(true);
    let ty = probe.component_type("Runaway");

    root.render(component(&ty, Props::new()));
    root.settle();

    // The initial render plus one per allowed flush.
    assert_eq!(probe.renders.get(), 51);
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], RenderError::CascadeLimit { count: 51, limit: 50 }));
}

#[test]
fn test_cascade_counter_resets_between_turns() {
    let (_doc, _container, root) = root(RuntimeConfig::default().with_max_cascade(3));
    let errors = collect_errors(&root);
    let probe = Probe::default();
    let ty = probe.component_type("Probe");
    root.render(component(&ty, Props::new()));

    for _ in 0..5 {
        probe.schedule();
        root.settle();
    }
    assert_eq!(probe.renders.get(), 6);
    assert!(errors.borrow().is_empty());
}

#[test]
fn test_render_error_is_isolated() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let errors = collect_errors(&root);
    let (broken, healthy) = (Probe::default(), Probe::default());
    let (broken_ty, healthy_ty) = (broken.component_type("Broken"), healthy.component_type("Healthy"));

    root.render(
        h("div")
            .child(component(&broken_ty, Props::new()))
            .child(component(&healthy_ty, Props::new())),
    );

    broken.fail.set(true);
    broken.schedule();
    healthy.schedule();
    root.settle();

    // The failing component keeps its last output; its sibling updated.
    assert_eq!(container.text_content(), "render 1render 2");
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        RenderError::Component { component, source } => {
            assert_eq!(component, "Broken");
            assert_eq!(source.message, "probe failure");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_first_render_error_leaves_no_output() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let errors = collect_errors(&root);
    let broken = Probe::default();
    broken.fail.set(true);
    let ty = broken.component_type("Broken");

    root.render(h("div").child(component(&ty, Props::new())).child(text("after")));
    assert_eq!(container.text_content(), "after");
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_pending_ancestor_subsumes_descendant() {
    let (_doc, _container, root) = root(RuntimeConfig::default());
    let child = Probe::default();
    let child_ty = child.component_type("Child");
    let parent = Probe {
        child: Some(child_ty),
        ..Probe::default()
    };
    let parent_ty = parent.component_type("Parent");
    root.render(component(&parent_ty, Props::new()));

    child.schedule();
    parent.schedule();
    root.settle();

    assert_eq!(parent.renders.get(), 2);
    // Re-rendered once, as part of its parent.
    assert_eq!(child.renders.get(), 2);
}

#[test]
fn test_tasks_run_after_commit() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let seen = Rc::new(RefCell::new(String::new()));
    let ty = {
        let (seen, container) = (seen.clone(), container.clone());
        ComponentType::new("WithTask", move || {
            let (seen, container) = (seen.clone(), container.clone());
            Box::new(TaskComponent { seen, container }) as Box<dyn Component>
        })
    };

    root.render(component(&ty, Props::new()));
    assert!(seen.borrow().is_empty());
    root.settle();
    assert_eq!(*seen.borrow(), "committed");
}

struct TaskComponent {
    seen: Rc<RefCell<String>>,
    container: spark_dom::DomNode,
}

impl Component for TaskComponent {
    fn render(&mut self, _props: &Props) -> Result<Rendered, ComponentError> {
        let (seen, container) = (self.seen.clone(), self.container.clone());
        Ok(Rendered::new(h("p").child(text("committed")))
            .with_task(move || *seen.borrow_mut() = container.text_content())
            .with_task(|| panic!("task failure"))
            .with_task(|| {}))
    }
}

#[test]
fn test_panicking_task_is_reported() {
    let (_doc, _container, root) = root(RuntimeConfig::default());
    let errors = collect_errors(&root);
    let seen = Rc::new(RefCell::new(String::new()));
    let ty = {
        let seen = seen.clone();
        let container = root.container().clone();
        ComponentType::new("Panicky", move || {
            Box::new(TaskComponent {
                seen: seen.clone(),
                container: container.clone(),
            }) as Box<dyn Component>
        })
    };

    root.render(component(&ty, Props::new()));
    root.settle();

    assert_eq!(*seen.borrow(), "committed");
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], RenderError::TaskPanicked { message } if message == "task failure"));
}

#[test]
fn test_removed_component_updater_is_inert() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let probe = Probe::default();
    let ty = probe.component_type("Probe");
    root.render(h("div").child(component(&ty, Props::new())));

    root.render(h("div"));
    root.settle();
    assert!(probe.removed.get());

    probe.schedule();
    assert!(!root.has_pending_updates());
    root.settle();
    assert_eq!(probe.renders.get(), 1);
    assert_eq!(container.text_content(), "");
}

#[test]
fn test_stateful_counter_from_fn() {
    let (_doc, container, root) = root(RuntimeConfig::default());
    let bump: Rc<RefCell<Option<Box<dyn Fn()>>>> = Rc::default();
    let ty = {
        let bump = bump.clone();
        ComponentType::from_fn("Counter", move |update: ScheduleUpdate| {
            let count = Rc::new(Cell::new(0));
            let increment = {
                let count = count.clone();
                move || {
                    count.set(count.get() + 1);
                    update.schedule();
                }
            };
            *bump.borrow_mut() = Some(Box::new(increment));
            Box::new(move |_props: &Props| -> Node { text(count.get().to_string()) })
        })
    };

    root.render(component(&ty, Props::new()));
    assert_eq!(container.text_content(), "0");

    for _ in 0..2 {
        (bump.borrow().as_ref().unwrap())();
    }
    root.settle();
    assert_eq!(container.text_content(), "2");
}
