//! Cooperative cancellation.
//!
//! A [`CancelToken`] is handed to every tile fetch when it is admitted to the
//! [`ConcurrencyWindow`](crate::ConcurrencyWindow), and a caller may attach
//! one to a [`RenderRequest`](crate::RenderRequest) to stop a whole render.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Hook = Box<dyn FnOnce() + Send>;

struct CancelState {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<Hook>>,
}

/// A cloneable, thread-safe cancellation flag with run-once hooks.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the token and run its hooks.
    ///
    /// Returns `true` for the call that actually cancelled; later calls are
    /// no-ops and return `false`, so hooks fire exactly once.
    pub fn cancel(&self) -> bool {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hooks = std::mem::take(
            &mut *self
                .state
                .hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for hook in hooks {
            hook();
        }
        true
    }

    /// Register a hook to run when the token is cancelled.
    ///
    /// If the token is already cancelled the hook runs immediately.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        {
            let mut hooks = self
                .state
                .hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.is_cancelled() {
                hooks.push(Box::new(hook));
                return;
            }
        }
        hook();
    }

    /// A new token that is cancelled whenever `self` is.
    ///
    /// The child can also be cancelled on its own without affecting `self`.
    /// `self` only keeps a weak reference, so a dropped child costs nothing
    /// but an empty hook.
    #[must_use]
    pub fn child(&self) -> Self {
        let child = Self::new();
        let weak = Arc::downgrade(&child.state);
        self.on_cancel(move || {
            if let Some(state) = weak.upgrade() {
                let _ = Self { state }.cancel();
            }
        });
        child
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancel_runs_hooks_once() {
        let token = CancelToken::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        token.on_cancel(move || {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.clone().is_cancelled());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_after_cancel_runs_immediately() {
        let token = CancelToken::new();
        let _ = token.cancel();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        token.on_cancel(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = CancelToken::new();
        let first = parent.child();
        let second = parent.child();
        assert!(first.cancel());
        assert!(!parent.is_cancelled());
        assert!(!second.is_cancelled());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        second.on_cancel(move || {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(parent.cancel());
        assert!(second.is_cancelled());
        assert!(!second.cancel());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(parent.child().is_cancelled());
    }
}
