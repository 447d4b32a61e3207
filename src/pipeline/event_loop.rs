//! Event Loop - Microtasks, 0 ms timers and spawned futures.
//!
//! The engine is single-threaded and cooperative. Everything that a browser
//! would defer goes through this loop:
//! - Microtasks: scheduler flushes, controlled-value restores
//! - Macrotasks: the cascade counter reset (a 0 ms timer)
//! - Futures: frame resolution, deferred mixin teardown, async handlers
//!
//! A microtask checkpoint drains the microtask queue and polls spawned
//! futures until neither makes progress, so a future that completes and
//! queues a microtask is handled in the same checkpoint.
//!
//! # Example
//!
//! ```ignore
//! let event_loop = EventLoop::new();
//! event_loop.queue_microtask(|| println!("after the current task"));
//! event_loop.queue_macrotask(|| println!("next turn"));
//! event_loop.run_until_idle();
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::types::Task;

/// Turns `run_until_idle` takes before giving up on a loop that keeps
/// scheduling timers.
pub const MAX_IDLE_TURNS: usize = 10_000;

pub struct EventLoop {
    microtasks: RefCell<VecDeque<Task>>,
    macrotasks: RefCell<VecDeque<Task>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl EventLoop {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            microtasks: RefCell::new(VecDeque::new()),
            macrotasks: RefCell::new(VecDeque::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Queue a 0 ms timer.
    pub fn queue_macrotask(&self, task: impl FnOnce() + 'static) {
        self.macrotasks.borrow_mut().push_back(Box::new(task));
    }

    /// Spawn a `!Send` future on the loop.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(future) {
            tracing::error!("failed to spawn future on the event loop: {err}");
        }
    }

    pub fn has_pending_microtasks(&self) -> bool {
        !self.microtasks.borrow().is_empty()
    }

    pub fn has_pending_macrotasks(&self) -> bool {
        !self.macrotasks.borrow().is_empty()
    }

    /// Microtask checkpoint.
    ///
    /// Reentrant calls (a microtask that itself asks for a checkpoint) return
    /// immediately; the outer checkpoint keeps draining.
    pub fn run_microtasks(&self) {
        loop {
            while let Some(task) = self.pop_microtask() {
                task();
            }
            match self.pool.try_borrow_mut() {
                Ok(mut pool) => pool.run_until_stalled(),
                Err(_) => return,
            }
            if !self.has_pending_microtasks() {
                return;
            }
        }
    }

    /// Run one macrotask, then a microtask checkpoint. Returns `false` if there
    /// was no macrotask to run.
    pub fn turn(&self) -> bool {
        self.run_microtasks();
        let task = self.macrotasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                self.run_microtasks();
                true
            }
            None => false,
        }
    }

    /// Turn until no microtask or timer is queued. Futures waiting on
    /// something outside the loop stay pending.
    pub fn run_until_idle(&self) {
        for _ in 0..MAX_IDLE_TURNS {
            if !self.turn() {
                return;
            }
        }
        tracing::warn!("event loop still busy after {MAX_IDLE_TURNS} turns");
    }

    fn pop_microtask(&self) -> Option<Task> {
        self.microtasks.borrow_mut().pop_front()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
