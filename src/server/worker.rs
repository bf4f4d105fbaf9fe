//! # Work Queue and Worker Pool
//!
//! The acceptor side enqueues one item per protocol line; a fixed pool of
//! worker threads drains the queue and executes commands against the cache
//! facade. Workers block on the queue's condition variable when idle and
//! re-check the stop flag on every wake-up, so shutdown is a flag flip plus
//! a broadcast. In-flight items complete; items still queued at shutdown
//! are dropped with their connections.

use std::collections::VecDeque;
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// One protocol line awaiting execution, with the connection to answer on.
pub(crate) struct WorkItem {
    pub client_id: String,
    pub line: String,
    pub stream: Arc<Mutex<TcpStream>>,
}

#[derive(Default)]
pub(crate) struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
    ready: Condvar,
    should_stop: AtomicBool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: WorkItem) {
        self.items.lock().push_back(item);
        self.ready.notify_one();
    }

    /// Blocks until an item is available or shutdown is requested. Returns
    /// `None` only on shutdown.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut items = self.items.lock();
        loop {
            if self.should_stop.load(Ordering::Acquire) {
                return None;
            }
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            self.ready.wait(&mut items);
        }
    }

    pub fn shutdown(&self) {
        self.should_stop.store(true, Ordering::Release);
        self.ready.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }
}

/// Writes one response line to the item's connection. A dead connection is
/// not an error: the client has gone, its response is dropped.
pub(crate) fn send_response(item: &WorkItem, response: &str) {
    let mut stream = item.stream.lock();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(b"\n");
}
