//! Outbound send queue.
//!
//! Commands are never written straight to the socket: they queue here
//! and the session drains one entry per tick, only while the transport
//! is open and not backpressured. FIFO order is preserved; entries are
//! dropped only by `clear` on disconnect.

use std::collections::VecDeque;
use std::sync::Mutex;

use groundlink_proto::Envelope;

#[derive(Debug, Default)]
pub struct SendQueue {
    entries: Mutex<VecDeque<Envelope>>,
}

impl SendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Non-blocking, unbounded -- callers are
    /// trusted not to flood.
    pub fn enqueue(&self, envelope: Envelope) {
        self.lock().push_back(envelope);
    }

    /// Take the head entry if all transmit conditions hold: transport
    /// open, no outbound backpressure, queue non-empty. One entry per
    /// call so a drain tick sends at most one frame.
    pub fn pop_ready(&self, transport_open: bool, backpressured: bool) -> Option<Envelope> {
        if !transport_open || backpressured {
            return None;
        }
        self.lock().pop_front()
    }

    /// Drop every queued entry. Only the session calls this, on
    /// disconnect -- queued intents are meaningless against a new
    /// session.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Envelope>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
