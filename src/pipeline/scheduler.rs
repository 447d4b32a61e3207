//! Scheduler - Batch component updates into microtask flushes.
//!
//! ```text
//! Idle ──enqueue──▶ FlushScheduled ──microtask──▶ Flushing ──▶ Idle
//! ```
//!
//! A flush:
//! 1. Snapshots and clears the batch
//! 2. Counts itself against the cascade ceiling (reset by a 0 ms timer, so
//!    only flushes within one event-loop turn count)
//! 3. Drops targets with a pending ancestor (the ancestor re-renders them)
//! 4. Runs one pass: capture selection → `BeforeUpdate` → re-render →
//!    restore selection → `Commit`
//! 5. Runs deferred tasks, each isolated
//!
//! Render order among unrelated targets is unspecified.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use indexmap::IndexMap;

use super::context::{Phase, RootContext};
use crate::dom::DomNode;
use crate::engine::registry::{InstanceId, Tree};
use crate::error::RenderError;
use crate::reconciler;
use crate::state::focus;
use crate::types::Task;

/// What a flush re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    /// The whole root, re-diffing its last tree.
    Root,
    Component(InstanceId),
}

#[derive(Default)]
pub struct SchedulerState {
    /// Pending target → DOM parent it renders into.
    batch: IndexMap<UpdateTarget, DomNode>,
    tasks: Vec<Task>,
    flush_scheduled: bool,
    cascade: usize,
    reset_scheduled: bool,
}

impl SchedulerState {
    pub fn is_idle(&self) -> bool {
        !self.flush_scheduled && self.batch.is_empty() && self.tasks.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub(crate) fn clear(&mut self) {
        self.batch.clear();
        self.tasks.clear();
    }
}

// =============================================================================
// Enqueue
// =============================================================================

/// Mark `target` for re-render in the next flush.
pub fn enqueue(cx: &RootContext, target: UpdateTarget) {
    if cx.is_unmounted() {
        return;
    }
    let dom_parent = match target {
        UpdateTarget::Root => cx.container.clone(),
        UpdateTarget::Component(id) => match cx.tree.borrow().get(id) {
            Some(instance) => instance.dom_parent.clone(),
            // Removed; its updater is a no-op.
            None => return,
        },
    };
    cx.scheduler.borrow_mut().batch.insert(target, dom_parent);
    schedule_flush(cx);
}

/// Queue work to run after the next commit.
pub fn enqueue_tasks(cx: &RootContext, tasks: Vec<Task>) {
    if tasks.is_empty() || cx.is_unmounted() {
        return;
    }
    cx.scheduler.borrow_mut().tasks.extend(tasks);
    schedule_flush(cx);
}

fn schedule_flush(cx: &RootContext) {
    {
        let mut state = cx.scheduler.borrow_mut();
        if state.flush_scheduled {
            return;
        }
        state.flush_scheduled = true;
    }
    let weak = cx.weak();
    cx.event_loop.queue_microtask(move || {
        if let Some(cx) = weak.upgrade() {
            flush(&cx);
        }
    });
}

// =============================================================================
// Flush
// =============================================================================

pub(crate) fn flush(cx: &RootContext) {
    let (batch, tasks) = {
        let mut state = cx.scheduler.borrow_mut();
        state.flush_scheduled = false;
        (std::mem::take(&mut state.batch), std::mem::take(&mut state.tasks))
    };
    if (batch.is_empty() && tasks.is_empty()) || cx.is_unmounted() {
        return;
    }

    let count = bump_cascade(cx);
    let limit = cx.config.max_cascade;
    if count > limit {
        cx.report(RenderError::CascadeLimit { count, limit });
        return;
    }

    let targets = select_targets(&cx.tree.borrow(), &batch);
    tracing::debug!(
        pending = batch.len(),
        rendering = targets.len(),
        tasks = tasks.len(),
        cascade = count,
        "scheduler flush"
    );

    if !targets.is_empty() {
        let mut parents: Vec<DomNode> = Vec::new();
        for target in &targets {
            if let Some(parent) = batch.get(target) {
                if !parents.contains(parent) {
                    parents.push(parent.clone());
                }
            }
        }
        run_pass(cx, &parents, || {
            for target in targets {
                if let Err(err) = reconciler::rerender(cx, target) {
                    cx.report(err);
                }
            }
        });
    }

    // Tasks queued by this flush's renders run now, not in another flush.
    let mut tasks = tasks;
    tasks.append(&mut cx.scheduler.borrow_mut().tasks);
    run_tasks(cx, tasks);
}

/// One mutation pass over `parents`. Focus and selection are restored
/// before `Commit` listeners run.
pub(crate) fn run_pass<R>(cx: &RootContext, parents: &[DomNode], pass: impl FnOnce() -> R) -> R {
    let saved = focus::capture(&cx.document);
    cx.dispatch_phase(Phase::BeforeUpdate, parents);
    let out = pass();
    focus::restore(&cx.document, saved);
    cx.dispatch_phase(Phase::Commit, parents);
    out
}

fn bump_cascade(cx: &RootContext) -> usize {
    let (count, schedule_reset) = {
        let mut state = cx.scheduler.borrow_mut();
        state.cascade += 1;
        let schedule_reset = !state.reset_scheduled;
        state.reset_scheduled = true;
        (state.cascade, schedule_reset)
    };
    if schedule_reset {
        let weak = cx.weak();
        cx.event_loop.queue_macrotask(move || {
            if let Some(cx) = weak.upgrade() {
                let mut state = cx.scheduler.borrow_mut();
                state.cascade = 0;
                state.reset_scheduled = false;
            }
        });
    }
    count
}

/// Targets without a pending ancestor, in batch order. Ancestors already
/// known to have no pending ancestor of their own are memoized, so sibling
/// subtrees share one walk.
fn select_targets(tree: &Tree, batch: &IndexMap<UpdateTarget, DomNode>) -> Vec<UpdateTarget> {
    if batch.contains_key(&UpdateTarget::Root) {
        return vec![UpdateTarget::Root];
    }

    let mut clear: HashSet<InstanceId> = HashSet::new();
    let mut targets = Vec::with_capacity(batch.len());
    for target in batch.keys() {
        let UpdateTarget::Component(id) = *target else { continue };
        let Some(instance) = tree.get(id) else { continue };

        let mut path = Vec::new();
        let mut skip = false;
        let mut current = instance.parent;
        while let Some(ancestor) = current {
            if clear.contains(&ancestor) {
                break;
            }
            if batch.contains_key(&UpdateTarget::Component(ancestor)) {
                skip = true;
                break;
            }
            path.push(ancestor);
            current = tree.get(ancestor).and_then(|a| a.parent);
        }
        if skip {
            continue;
        }
        clear.extend(path);
        targets.push(*target);
    }
    targets
}

fn run_tasks(cx: &RootContext, tasks: Vec<Task>) {
    for task in tasks {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            cx.report(RenderError::TaskPanicked { message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::dom::Document;
    use crate::engine::registry::{Instance, InstanceKind};
    use crate::engine::node::fragment;
    use crate::types::Namespace;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> Rc<RootContext> {
        let doc = Document::new();
        let body = doc.body();
        RootContext::new(doc, body, RuntimeConfig::default())
    }

    fn node(tree: &mut Tree, parent: Option<InstanceId>, body: &DomNode) -> InstanceId {
        tree.allocate(Instance::new(
            fragment([]),
            parent,
            body.clone(),
            Namespace::Html,
            InstanceKind::Fragment(Vec::new()),
        ))
    }

    #[test]
    fn test_select_targets_skips_descendants() {
        let doc = Document::new();
        let body = doc.body();
        let mut tree = Tree::new();
        let top = node(&mut tree, None, &body);
        let mid = node(&mut tree, Some(top), &body);
        let leaf = node(&mut tree, Some(mid), &body);
        let other = node(&mut tree, None, &body);

        let mut batch = IndexMap::new();
        batch.insert(UpdateTarget::Component(leaf), body.clone());
        batch.insert(UpdateTarget::Component(mid), body.clone());
        batch.insert(UpdateTarget::Component(other), body.clone());

        let targets = select_targets(&tree, &batch);
        assert_eq!(
            targets,
            vec![UpdateTarget::Component(mid), UpdateTarget::Component(other)]
        );
    }

    #[test]
    fn test_root_target_covers_everything() {
        let doc = Document::new();
        let body = doc.body();
        let mut tree = Tree::new();
        let a = node(&mut tree, None, &body);
        let mut batch = IndexMap::new();
        batch.insert(UpdateTarget::Component(a), body.clone());
        batch.insert(UpdateTarget::Root, body.clone());
        assert_eq!(select_targets(&tree, &batch), vec![UpdateTarget::Root]);
    }

    #[test]
    fn test_tasks_run_after_flush_and_panics_are_reported() {
        let cx = context();
        let ran = Rc::new(RefCell::new(Vec::new()));
        let errors = Rc::new(RefCell::new(Vec::new()));
        let errors_clone = errors.clone();
        cx.on_error(Rc::new(move |err| errors_clone.borrow_mut().push(err.to_string())));

        let r1 = ran.clone();
        let r2 = ran.clone();
        enqueue_tasks(
            &cx,
            vec![
                Box::new(move || r1.borrow_mut().push(1)),
                Box::new(|| panic!("task failed")),
                Box::new(move || r2.borrow_mut().push(3)),
            ],
        );
        assert!(ran.borrow().is_empty());

        cx.event_loop.run_microtasks();
        assert_eq!(*ran.borrow(), vec![1, 3]);
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("task failed"));
    }

    #[test]
    fn test_cascade_counter_resets_next_turn() {
        let cx = context();
        for _ in 0..3 {
            enqueue_tasks(&cx, vec![Box::new(|| {})]);
            cx.event_loop.run_microtasks();
        }
        assert_eq!(cx.scheduler.borrow().cascade, 3);
        cx.event_loop.run_until_idle();
        assert_eq!(cx.scheduler.borrow().cascade, 0);
        assert!(cx.scheduler.borrow().is_idle());
    }
}
