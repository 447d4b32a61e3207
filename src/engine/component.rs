//! Components - The handle contract the reconciler drives.
//!
//! Component execution (state, context) lives outside the engine. The engine
//! only needs three operations from a component instance:
//! - `render(props)` → the tree to diff plus deferred tasks
//! - `set_schedule_update(cb)` → how the instance asks for a re-render
//! - `remove()` → final cleanup, returning deferred tasks
//!
//! # Example
//!
//! ```ignore
//! // Setup runs once per instance and receives the update callback;
//! // the returned closure renders.
//! let counter = ComponentType::from_fn("Counter", |update| {
//!     let count = Rc::new(Cell::new(0));
//!     Box::new(move |_props| {
//!         let (count, update) = (count.clone(), update.clone());
//!         h("button")
//!             .mix([on("click", move |_| { count.set(count.get() + 1); update.schedule(); })])
//!             .child(text(count.get().to_string()))
//!             .build()
//!     })
//! });
//! ```

use std::rc::Rc;

use super::node::Node;
use crate::error::ComponentError;
use crate::types::{Props, Task};

// =============================================================================
// Render Output
// =============================================================================

/// What a component render produces.
pub struct Rendered {
    pub tree: Node,
    /// Work to run after the commit that includes this render.
    pub tasks: Vec<Task>,
}

impl Rendered {
    pub fn new(tree: impl Into<Node>) -> Self {
        Self {
            tree: tree.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: impl FnOnce() + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }
}

impl From<Node> for Rendered {
    fn from(tree: Node) -> Self {
        Rendered::new(tree)
    }
}

// =============================================================================
// Schedule Update
// =============================================================================

/// Callback a component instance calls to request a re-render. Becomes a
/// no-op once the instance is removed.
#[derive(Clone)]
pub struct ScheduleUpdate(Rc<dyn Fn()>);

impl ScheduleUpdate {
    pub(crate) fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// An updater that does nothing.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Enqueue the owning instance on its root's scheduler.
    pub fn schedule(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for ScheduleUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScheduleUpdate(..)")
    }
}

// =============================================================================
// Component Handle
// =============================================================================

/// A live component instance.
pub trait Component {
    /// Render with the given props.
    fn render(&mut self, props: &Props) -> Result<Rendered, ComponentError>;

    /// Called once, before the first render.
    fn set_schedule_update(&mut self, _schedule: ScheduleUpdate) {}

    /// Called once when the instance leaves the tree.
    fn remove(&mut self) -> Vec<Task> {
        Vec::new()
    }
}

struct ComponentTypeInner {
    name: String,
    factory: Box<dyn Fn() -> Box<dyn Component>>,
}

/// A component type. Identity is by pointer: two types built separately are
/// different types even with the same name.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentTypeInner>);

impl ComponentType {
    /// A type whose instances are produced by `factory`.
    pub fn new(name: impl Into<String>, factory: impl Fn() -> Box<dyn Component> + 'static) -> Self {
        Self(Rc::new(ComponentTypeInner {
            name: name.into(),
            factory: Box::new(factory),
        }))
    }

    /// A type that renders `props → tree` with no state.
    pub fn stateless(name: impl Into<String>, render: impl Fn(&Props) -> Node + 'static) -> Self {
        let render: Rc<dyn Fn(&Props) -> Node> = Rc::new(render);
        Self::new(name, move || {
            Box::new(StatelessComponent { render: render.clone() }) as Box<dyn Component>
        })
    }

    /// A type with a setup phase: `setup` runs once per instance with its
    /// update callback and returns the render closure.
    pub fn from_fn(
        name: impl Into<String>,
        setup: impl Fn(ScheduleUpdate) -> RenderFn + 'static,
    ) -> Self {
        let setup: Rc<dyn Fn(ScheduleUpdate) -> RenderFn> = Rc::new(setup);
        Self::new(name, move || {
            Box::new(FnComponent {
                setup: setup.clone(),
                render: None,
            }) as Box<dyn Component>
        })
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn create(&self) -> Box<dyn Component> {
        (self.0.factory)()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentType({})", self.0.name)
    }
}

/// Render closure produced by a [`ComponentType::from_fn`] setup.
pub type RenderFn = Box<dyn FnMut(&Props) -> Node>;

struct StatelessComponent {
    render: Rc<dyn Fn(&Props) -> Node>,
}

impl Component for StatelessComponent {
    fn render(&mut self, props: &Props) -> Result<Rendered, ComponentError> {
        Ok(Rendered::new((self.render)(props)))
    }
}

struct FnComponent {
    setup: Rc<dyn Fn(ScheduleUpdate) -> RenderFn>,
    render: Option<RenderFn>,
}

impl Component for FnComponent {
    fn render(&mut self, props: &Props) -> Result<Rendered, ComponentError> {
        let render = self
            .render
            .get_or_insert_with(|| (self.setup)(ScheduleUpdate::noop()));
        Ok(Rendered::new(render(props)))
    }

    fn set_schedule_update(&mut self, schedule: ScheduleUpdate) {
        self.render = Some((self.setup)(schedule));
    }
}
