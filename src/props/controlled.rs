//! Controlled Reflection - Keep `value` / `checked` pinned to their props.
//!
//! A form control whose props declare `value` or `checked` is controlled: the
//! user typing into it must not win over the prop. After every `input` or
//! `change` event a restore is queued as a microtask; it writes the last
//! prop-driven value back if the DOM property drifted. Each event bumps a
//! version so only the newest restore runs, and the whole reflection is
//! cancelled through its abort controller when the node goes away.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{DomNode, ListenerId};
use crate::engine::abort::AbortController;
use crate::pipeline::event_loop::EventLoop;
use crate::types::{PropValue, Props};

const CONTROLLED_PROPS: &[&str] = &["value", "checked"];
const WATCHED_EVENTS: &[&str] = &["input", "change"];

struct ControlledState {
    dom: DomNode,
    /// Last prop-driven value per controlled property.
    values: RefCell<Vec<(&'static str, PropValue)>>,
    version: Cell<u64>,
    controller: AbortController,
}

impl ControlledState {
    fn restore(&self) {
        let values = self.values.borrow().clone();
        for (name, value) in values {
            if !self.dom.get_property(name).same(&value) {
                tracing::trace!(property = name, "restoring controlled value");
                self.dom.set_property(name, value);
            }
        }
    }
}

/// Reflection state for one controlled element.
pub struct ControlledReflection {
    state: Rc<ControlledState>,
    listeners: Vec<ListenerId>,
}

impl ControlledReflection {
    /// Bring the reflection for `dom` in line with `props`: install it when
    /// the props start controlling the element, update the pinned values
    /// while they do, and tear it down when they stop.
    pub fn sync(
        current: Option<ControlledReflection>,
        dom: &DomNode,
        props: &Props,
        event_loop: &Rc<EventLoop>,
    ) -> Option<ControlledReflection> {
        let values = controlled_values(props);
        if values.is_empty() {
            if let Some(current) = current {
                current.teardown();
            }
            return None;
        }

        match current {
            Some(current) => {
                *current.state.values.borrow_mut() = values;
                Some(current)
            }
            None => Some(Self::install(dom, values, event_loop)),
        }
    }

    fn install(dom: &DomNode, values: Vec<(&'static str, PropValue)>, event_loop: &Rc<EventLoop>) -> Self {
        let state = Rc::new(ControlledState {
            dom: dom.clone(),
            values: RefCell::new(values),
            version: Cell::new(0),
            controller: AbortController::new(),
        });

        let listeners = WATCHED_EVENTS
            .iter()
            .map(|event_type| {
                let state = Rc::downgrade(&state);
                let event_loop = Rc::downgrade(event_loop);
                dom.add_event_listener(
                    event_type,
                    Rc::new(move |_event| {
                        let (Some(state), Some(event_loop)) = (state.upgrade(), event_loop.upgrade()) else {
                            return;
                        };
                        let version = state.version.get() + 1;
                        state.version.set(version);
                        let signal = state.controller.signal();
                        event_loop.queue_microtask(move || {
                            if signal.aborted() || state.version.get() != version {
                                return;
                            }
                            state.restore();
                        });
                    }),
                )
            })
            .collect();

        Self { state, listeners }
    }

    /// Remove the listeners and cancel any queued restore.
    pub fn teardown(self) {
        self.state.controller.abort();
        for id in self.listeners {
            self.state.dom.remove_event_listener(id);
        }
    }
}

/// `(name, value)` for every controlled prop present and non-null.
fn controlled_values(props: &Props) -> Vec<(&'static str, PropValue)> {
    CONTROLLED_PROPS
        .iter()
        .filter_map(|name| match props.get(*name) {
            Some(value) if !value.is_null() => Some((*name, value.clone())),
            _ => None,
        })
        .collect()
}
