//! Integration tests for the bounded fetch window.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tileprint_render::{CancelToken, ConcurrencyWindow, RenderError, Task};

/// Sleeps, then reports its id.
struct Sleepy {
    id: usize,
    delay: Duration,
}

impl Task for Sleepy {
    type Output = usize;

    fn run(self, _cancel: &CancelToken) -> usize {
        thread::sleep(self.delay);
        self.id
    }
}

/// Blocks until cancelled (or a generous deadline), counting cancellations.
struct Blocking {
    id: usize,
    cancelled: Arc<AtomicUsize>,
}

impl Task for Blocking {
    type Output = usize;

    fn run(self, cancel: &CancelToken) -> usize {
        if self.id == 0 {
            return 0;
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                let _ = self.cancelled.fetch_add(1, Ordering::SeqCst);
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        self.id
    }
}

struct Panicking;

impl Task for Panicking {
    type Output = ();

    fn run(self, _cancel: &CancelToken) {
        panic!("worker failure");
    }
}

fn wait_for(counter: &AtomicUsize, expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(3);
    while counter.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    counter.load(Ordering::SeqCst)
}

#[test]
fn test_results_follow_admission_order() {
    // Later tasks finish first.
    let tasks = (0..8).map(|id| Sleepy {
        id,
        delay: Duration::from_millis(40 - 5 * id as u64),
    });
    let window = ConcurrencyWindow::new(tasks, 4);
    let ids: Vec<usize> = window.map(Result::unwrap).collect();
    assert_eq!(ids, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_at_most_n_admitted() {
    let admitted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&admitted);
    let tasks = (0..50).map(move |id| {
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        Sleepy {
            id,
            delay: Duration::ZERO,
        }
    });

    let mut window = ConcurrencyWindow::new(tasks, 5);
    assert_eq!(admitted.load(Ordering::SeqCst), 5);
    assert_eq!(window.in_flight(), 5);

    assert_eq!(window.next().unwrap().unwrap(), 0);
    assert_eq!(admitted.load(Ordering::SeqCst), 6);
    assert_eq!(window.in_flight(), 5);

    let rest: Vec<usize> = window.map(Result::unwrap).collect();
    assert_eq!(rest.len(), 49);
    assert_eq!(admitted.load(Ordering::SeqCst), 50);
}

#[test]
fn test_fewer_tasks_than_depth() {
    let tasks = (0..3).map(|id| Sleepy {
        id,
        delay: Duration::ZERO,
    });
    let mut window = ConcurrencyWindow::new(tasks, 20);
    assert_eq!(window.in_flight(), 3);
    assert_eq!(window.by_ref().count(), 3);
    assert!(window.next().is_none());
}

#[test]
fn test_zero_depth_still_progresses() {
    let tasks = (0..3).map(|id| Sleepy {
        id,
        delay: Duration::ZERO,
    });
    let window = ConcurrencyWindow::new(tasks, 0);
    assert_eq!(window.count(), 3);
}

#[test]
fn test_stop_cancels_outstanding_once() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let admitted = Arc::new(AtomicUsize::new(0));
    let (c, a) = (Arc::clone(&cancelled), Arc::clone(&admitted));
    let tasks = (0..10).map(move |id| {
        let _ = a.fetch_add(1, Ordering::SeqCst);
        Blocking {
            id,
            cancelled: Arc::clone(&c),
        }
    });

    let mut window = ConcurrencyWindow::new(tasks, 4);
    assert_eq!(window.next().unwrap().unwrap(), 0);
    assert_eq!(window.in_flight(), 4);

    window.stop();
    window.stop();
    assert!(window.is_stopped());
    assert!(window.next().is_none());
    assert_eq!(window.in_flight(), 0);
    assert_eq!(admitted.load(Ordering::SeqCst), 5);
    assert_eq!(wait_for(&cancelled, 4), 4);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(cancelled.load(Ordering::SeqCst), 4);
}

#[test]
fn test_drop_stops_window() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&cancelled);
    let tasks = (1..4).map(move |id| Blocking {
        id,
        cancelled: Arc::clone(&c),
    });
    drop(ConcurrencyWindow::new(tasks, 3));
    assert_eq!(wait_for(&cancelled, 3), 3);
}

#[test]
fn test_panicking_worker_reports_lost() {
    let mut window = ConcurrencyWindow::new(std::iter::once(Panicking), 2);
    assert!(matches!(window.next(), Some(Err(RenderError::WorkerLost))));
    assert!(window.next().is_none());
}

#[test]
fn test_outside_cancel_wakes_blocked_next() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&cancelled);
    let tasks = (1..4).map(move |id| Blocking {
        id,
        cancelled: Arc::clone(&c),
    });
    let stop = CancelToken::new();
    let mut window = ConcurrencyWindow::with_cancel(tasks, 3, &stop);
    let trigger = stop.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        let _ = trigger.cancel();
    });

    let started = Instant::now();
    assert!(matches!(window.next(), Some(Err(RenderError::RenderCancelled))));
    assert!(started.elapsed() < Duration::from_secs(1));
    canceller.join().unwrap();

    assert!(window.is_stopped());
    assert!(window.next().is_none());
    assert_eq!(wait_for(&cancelled, 3), 3);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(cancelled.load(Ordering::SeqCst), 3);
}
