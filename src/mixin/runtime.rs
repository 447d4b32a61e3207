//! Mixin Runtime - Runner registry for one host node.
//!
//! Owned by the host instance. The reconciler drives it:
//! - `resolve(props)` on every render, before the property diff
//! - `bind(..)` once the node is in the DOM (`Insert`, or `Reclaimed`)
//! - `prepare_removal()` before a top-level removal, to collect deferred
//!   teardowns
//! - `cancel_pending_removal()` when a persisted node is reclaimed
//! - `teardown()` when the node is finally gone

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use super::handle::{Binding, MixinShared};
use super::{ErasedRunner, MixinConstructor, MixinDescriptor, MixinEventKind, MixinHandle, MixinResult, ScopeId};
use crate::dom::DomNode;
use crate::engine::abort::AbortController;
use crate::engine::node::Node;
use crate::error::MixinError;
use crate::pipeline::context::RootContext;
use crate::pipeline::scheduler::UpdateTarget;
use crate::types::{Key, PropValue, Props};

struct Runner {
    ctor: MixinConstructor,
    scope: ScopeId,
    run: ErasedRunner,
}

pub struct MixinRuntime {
    shared: Rc<MixinShared>,
    runners: RefCell<Vec<Runner>>,
}

impl MixinRuntime {
    pub(crate) fn new(cx: &RootContext, host_type: Rc<str>) -> Rc<Self> {
        Rc::new(Self {
            shared: MixinShared::new(cx, host_type),
            runners: RefCell::new(Vec::new()),
        })
    }

    /// Live runners.
    pub fn runner_count(&self) -> usize {
        self.runners.borrow().len()
    }

    /// Node-lifetime signal handed to every runner.
    pub fn signal(&self) -> crate::engine::abort::AbortSignal {
        self.shared.controller.signal()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.shared.binding.borrow().is_some()
    }

    // -------------------------------------------------------------------------
    // Resolve
    // -------------------------------------------------------------------------

    /// Run the node's `mix` list against `props` and return the composed
    /// props, with `mix` stripped.
    ///
    /// Runners are matched to descriptors by position and constructor
    /// identity. Nested `mix` output is processed as a worklist capped at
    /// `max_descriptors` positions.
    pub(crate) fn resolve(&self, props: &Props, max_descriptors: usize) -> Props {
        let mut queue: VecDeque<MixinDescriptor> = match props.get("mix") {
            Some(PropValue::Mix(list)) => list.iter().cloned().collect(),
            _ => VecDeque::new(),
        };
        let mut composed = props.clone();
        composed.shift_remove("mix");

        let mut runners = std::mem::take(&mut *self.runners.borrow_mut());
        let mut position = 0;

        while let Some(descriptor) = queue.pop_front() {
            if position >= max_descriptors {
                tracing::error!(
                    host = %self.shared.host_type,
                    "{}",
                    MixinError::DescriptorLimit { limit: max_descriptors }
                );
                break;
            }

            let reuse = runners
                .get(position)
                .is_some_and(|runner| runner.ctor == *descriptor.constructor());
            if !reuse {
                // The old runner leaves before the new one is constructed.
                if let Some(old) = runners.get(position) {
                    self.release_runner(old);
                }
                let runner = self.create_runner(descriptor.constructor());
                if position < runners.len() {
                    runners[position] = runner;
                } else {
                    runners.push(runner);
                }
                if self.is_bound() {
                    self.shared.dispatch(MixinEventKind::Insert, Some(runners[position].scope));
                }
            }

            let result = (runners[position].run)(descriptor.args(), &composed);
            self.merge_result(result, descriptor.constructor(), &mut composed, &mut queue);
            position += 1;
        }

        for old in runners.drain(position..).collect::<Vec<_>>() {
            self.release_runner(&old);
        }
        *self.runners.borrow_mut() = runners;

        composed.shift_remove("mix");
        composed
    }

    fn create_runner(&self, ctor: &MixinConstructor) -> Runner {
        let scope = match self.shared.context() {
            Some(cx) => ScopeId(cx.next_scope()),
            None => ScopeId(u64::MAX),
        };
        let handle = MixinHandle::new(scope, self.shared.clone());
        let run = ctor.construct(&handle, &self.shared.host_type);
        Runner {
            ctor: ctor.clone(),
            scope,
            run,
        }
    }

    /// Scoped `Remove`, then release the scope.
    fn release_runner(&self, runner: &Runner) {
        self.shared.dispatch(MixinEventKind::Remove, Some(runner.scope));
        self.shared.release_scope(runner.scope);
    }

    fn merge_result(
        &self,
        result: MixinResult,
        ctor: &MixinConstructor,
        composed: &mut Props,
        queue: &mut VecDeque<MixinDescriptor>,
    ) {
        match result {
            MixinResult::None | MixinResult::Placeholder => {}
            MixinResult::Mixin(descriptor) => queue.push_back(descriptor),
            MixinResult::Node(Node::Host(host)) if host.tag == self.shared.host_type => {
                for (name, value) in &host.props {
                    match (name.as_str(), value) {
                        ("mix", PropValue::Mix(list)) => queue.extend(list.iter().cloned()),
                        ("mix", _) => {}
                        _ => {
                            composed.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
            MixinResult::Node(Node::Host(host)) => {
                let err = MixinError::WrongHostType {
                    mixin: ctor.name().to_string(),
                    expected: self.shared.host_type.to_string(),
                    found: host.tag.to_string(),
                };
                tracing::error!("{err}");
            }
            MixinResult::Node(_) => {
                let err = MixinError::NotAHostNode {
                    mixin: ctor.name().to_string(),
                };
                tracing::error!("{err}");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Bind to the DOM node and dispatch `Insert` (or `Reclaimed`) to every
    /// runner.
    pub(crate) fn bind(&self, node: &DomNode, parent: &DomNode, key: Option<Key>, owner: UpdateTarget, reclaimed: bool) {
        *self.shared.binding.borrow_mut() = Some(Binding {
            node: node.clone(),
            parent: parent.clone(),
            key,
        });
        self.shared.owner.set(owner);
        let kind = if reclaimed {
            MixinEventKind::Reclaimed
        } else {
            MixinEventKind::Insert
        };
        self.shared.dispatch(kind, None);
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Dispatch `BeforeRemove` and start the teardowns runners registered
    /// with `persist_node`. `None` means the node can be removed now.
    pub(crate) fn prepare_removal(&self) -> Option<Vec<LocalBoxFuture<'static, ()>>> {
        *self.shared.persist_requests.borrow_mut() = Some(Vec::new());
        self.shared.dispatch(MixinEventKind::BeforeRemove, None);
        let requests = self.shared.persist_requests.borrow_mut().take().unwrap_or_default();
        if requests.is_empty() {
            return None;
        }

        let controller = AbortController::new();
        let futures = requests
            .into_iter()
            .map(|teardown| teardown(controller.signal()))
            .collect();
        *self.shared.pending_removal.borrow_mut() = Some(controller);
        Some(futures)
    }

    /// Abort in-flight deferred-removal teardowns. Returns `false` if none
    /// were pending.
    pub(crate) fn cancel_pending_removal(&self) -> bool {
        match self.shared.pending_removal.borrow_mut().take() {
            Some(controller) => {
                controller.abort();
                true
            }
            None => false,
        }
    }

    /// Final teardown: `Remove` to every runner, release every scope, abort
    /// the node signal. Runs once.
    pub(crate) fn teardown(&self) {
        if self.shared.torn_down.get() {
            return;
        }
        self.cancel_pending_removal();
        let runners = std::mem::take(&mut *self.runners.borrow_mut());
        for runner in &runners {
            self.release_runner(runner);
        }
        self.shared.shutdown();
    }
}

impl std::fmt::Debug for MixinRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixinRuntime")
            .field("host_type", &self.shared.host_type)
            .field("runners", &self.runner_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
