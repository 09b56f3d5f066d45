//! Frontier queue of URLs awaiting a crawl visit
//!
//! The frontier is a multi-producer multi-consumer queue: seeds and the
//! extraction pipeline push URLs in, crawl workers block on [`Frontier::next`]
//! until a URL is available or the frontier is closed by the stop signal.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Concurrent blocking queue of pending URLs.
pub struct Frontier {
    queue: Mutex<VecDeque<String>>,
    notify: Notify,
    closed: AtomicBool,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues a URL and wakes one waiting worker.
    ///
    /// Pushes are accepted even after close; the queue simply drains no
    /// further once workers have observed the closed flag.
    pub fn push(&self, url: String) {
        self.queue.lock().unwrap().push_back(url);
        self.notify.notify_one();
    }

    /// Number of URLs currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dequeues the next URL, suspending until one is available.
    ///
    /// Returns `None` once the frontier has been closed and a wakeup is
    /// observed; URLs already queued before the close are still handed out.
    pub async fn next(&self) -> Option<String> {
        loop {
            // Register interest before checking the queue so a push between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            if let Some(url) = self.queue.lock().unwrap().pop_front() {
                return Some(url);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Closes the frontier and wakes all waiting workers.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}
