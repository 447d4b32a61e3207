//! Cancellation tokens - `AbortController` / `AbortSignal`.
//!
//! Every async boundary in the engine takes an explicit signal: frame content
//! resolution, deferred mixin teardown, controlled-value restore and async
//! event handlers. A signal aborts at most once.
//!
//! # Example
//!
//! ```ignore
//! let controller = AbortController::new();
//! let signal = controller.signal();
//!
//! let work = async move {
//!     match select(fetch_content().boxed_local(), signal.cancelled()).await {
//!         Either::Left((content, _)) => Some(content),
//!         Either::Right(_) => None, // aborted
//!     }
//! };
//!
//! controller.abort();
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct SignalInner {
    aborted: Cell<bool>,
    callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    wakers: RefCell<Vec<Waker>>,
}

/// Read side of a cancellation token.
#[derive(Clone)]
pub struct AbortSignal(Rc<SignalInner>);

impl AbortSignal {
    fn new() -> Self {
        Self(Rc::new(SignalInner {
            aborted: Cell::new(false),
            callbacks: RefCell::new(Vec::new()),
            wakers: RefCell::new(Vec::new()),
        }))
    }

    /// A signal that never aborts.
    pub fn never() -> Self {
        Self::new()
    }

    pub fn aborted(&self) -> bool {
        self.0.aborted.get()
    }

    /// Run `callback` when the signal aborts. Runs immediately if it already
    /// has.
    pub fn on_abort(&self, callback: impl FnOnce() + 'static) {
        if self.aborted() {
            callback();
        } else {
            self.0.callbacks.borrow_mut().push(Box::new(callback));
        }
    }

    /// Future that completes when the signal aborts. Race it against other
    /// work with `futures::future::select`.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled { signal: self.clone() }
    }

    pub fn same(&self, other: &AbortSignal) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal").field("aborted", &self.aborted()).finish()
    }
}

/// Write side of a cancellation token.
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self { signal: AbortSignal::new() }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort the signal. Returns `false` if it was already aborted, in which
    /// case nothing runs.
    pub fn abort(&self) -> bool {
        let inner = &self.signal.0;
        if inner.aborted.replace(true) {
            return false;
        }
        let callbacks = std::mem::take(&mut *inner.callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
        let wakers = std::mem::take(&mut *inner.wakers.borrow_mut());
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.aborted()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`AbortSignal::cancelled`].
pub struct Cancelled {
    signal: AbortSignal,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.signal.aborted() {
            return Poll::Ready(());
        }
        let mut wakers = self.signal.0.wakers.borrow_mut();
        if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

// =============================================================================
// Tests
// =============================================================================
