//! Bounded-parallelism driver for tile fetches.
//!
//! The window pulls [`Task`]s from an upstream iterator, starts each one on a
//! worker thread as soon as it is admitted, and hands results back strictly in
//! admission order. At most `max_in_flight` tasks are admitted and unconsumed
//! at any time; consuming one result admits exactly one more.
//!
//! ```text
//! upstream ──admit──▶ [t0 t1 t2 … tN-1] ──next()──▶ consumer
//!                       │  │  │     │
//!                     worker threads (each with its own CancelToken)
//! ```
//!
//! Results are FIFO by admission, not by completion: a slow first tile holds
//! back faster later ones, which keeps composition order deterministic.
//!
//! A window built with [`ConcurrencyWindow::with_cancel`] follows an outside
//! stop signal: every admitted task's token is a child of it, and a blocked
//! [`next`](Iterator::next) wakes up with [`RenderError::RenderCancelled`].

use crate::cancel::CancelToken;
use crate::error::{RenderError, Result};
use crossbeam_channel::{Receiver, bounded, select};
use std::collections::VecDeque;
use std::thread;

/// Default number of concurrently outstanding fetches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

/// A unit of work the window can run on a worker thread.
pub trait Task: Send + 'static {
    /// What the task produces.
    type Output: Send + 'static;

    /// Run the task. `cancel` is cancelled if the window is stopped while the
    /// task is outstanding; long-running work should poll it.
    fn run(self, cancel: &CancelToken) -> Self::Output;
}

/// An admitted task: its cancellation hook and the slot its result lands in.
struct InFlight<T> {
    cancel: CancelToken,
    result: Receiver<T>,
}

/// The outside stop signal and the slot its cancellation is announced on.
struct External {
    cancel: CancelToken,
    signal: Receiver<()>,
}

/// A fixed-depth FIFO of running tasks over an upstream iterator.
pub struct ConcurrencyWindow<I>
where
    I: Iterator,
    I::Item: Task,
{
    upstream: I,
    queue: VecDeque<InFlight<<I::Item as Task>::Output>>,
    max_in_flight: usize,
    stopped: bool,
    external: Option<External>,
}

impl<I> ConcurrencyWindow<I>
where
    I: Iterator,
    I::Item: Task,
{
    /// Create a window and immediately admit up to `max_in_flight` tasks.
    ///
    /// A depth of zero is treated as one.
    #[must_use]
    pub fn new(upstream: impl IntoIterator<IntoIter = I>, max_in_flight: usize) -> Self {
        Self::start(upstream.into_iter(), max_in_flight, None)
    }

    /// Like [`new`](Self::new), but the window also stops when `cancel` is
    /// cancelled, from any thread.
    ///
    /// Cancelling `cancel` fires every outstanding task's token immediately,
    /// and a [`next`](Iterator::next) call blocked on the head task returns
    /// `Err(RenderCancelled)` without waiting for it.
    #[must_use]
    pub fn with_cancel(
        upstream: impl IntoIterator<IntoIter = I>,
        max_in_flight: usize,
        cancel: &CancelToken,
    ) -> Self {
        let (tx, signal) = bounded(1);
        cancel.on_cancel(move || {
            let _ = tx.try_send(());
        });
        let external = External {
            cancel: cancel.clone(),
            signal,
        };
        Self::start(upstream.into_iter(), max_in_flight, Some(external))
    }

    fn start(upstream: I, max_in_flight: usize, external: Option<External>) -> Self {
        let mut window = Self {
            upstream,
            queue: VecDeque::new(),
            max_in_flight: max_in_flight.max(1),
            stopped: false,
            external,
        };
        while window.queue.len() < window.max_in_flight && window.admit() {}
        window
    }

    /// Number of admitted tasks whose results have not been consumed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Pull one task from upstream and start it. Returns `false` when
    /// upstream is exhausted.
    fn admit(&mut self) -> bool {
        let Some(task) = self.upstream.next() else {
            return false;
        };
        let cancel = self
            .external
            .as_ref()
            .map_or_else(CancelToken::new, |external| external.cancel.child());
        let (tx, rx) = bounded(1);
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name("tile-fetch".to_string())
            .spawn(move || {
                // The receiver is gone if the window was stopped meanwhile.
                let _ = tx.send(task.run(&token));
            });
        if let Err(e) = spawned {
            // The closure and its sender were dropped; the slot reports
            // `WorkerLost` when consumed.
            log::error!(target: "tileprint::window", "failed to spawn fetch worker: {e}");
        }
        self.queue.push_back(InFlight { cancel, result: rx });
        true
    }

    /// Stop the window.
    ///
    /// Every outstanding task's cancellation hook fires exactly once, nothing
    /// more is admitted, and [`next`](Iterator::next) yields `None` from now on.
    /// Calling `stop` again is a no-op.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let outstanding = self.queue.len();
        for in_flight in self.queue.drain(..) {
            let _ = in_flight.cancel.cancel();
        }
        if outstanding > 0 {
            log::debug!(target: "tileprint::window", "stopped with {outstanding} fetches outstanding");
        }
    }
}

impl<I> Iterator for ConcurrencyWindow<I>
where
    I: Iterator,
    I::Item: Task,
{
    type Item = Result<<I::Item as Task>::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        let head = self.queue.pop_front()?;
        // `None` means the outside stop signal fired first.
        let received = match &self.external {
            Some(external) => select! {
                recv(head.result) -> msg => Some(msg),
                recv(external.signal) -> _ => None,
            },
            None => Some(head.result.recv()),
        };
        let Some(received) = received else {
            self.queue.push_front(head);
            self.stop();
            return Some(Err(RenderError::RenderCancelled));
        };
        let _ = self.admit();
        Some(received.map_err(|_| RenderError::WorkerLost))
    }
}

impl<I> Drop for ConcurrencyWindow<I>
where
    I: Iterator,
    I::Item: Task,
{
    fn drop(&mut self) {
        self.stop();
    }
}
