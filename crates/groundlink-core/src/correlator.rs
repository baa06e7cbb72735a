//! Self-echo suppression for state-changing requests.
//!
//! The bridge reflects every write back as an ordinary `data` update.
//! Without correlation the client would double-apply its own change the
//! moment it came back around. Each outgoing mutating request is tagged
//! with a fresh token; the first inbound frame carrying that token is
//! consumed silently and the token retired.
//!
//! Tokens whose echo is lost simply leak until the next disconnect --
//! they are session-scoped and cleared wholesale on reconnect.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Mints correlation tokens and tracks which are awaiting their echo.
#[derive(Debug, Default)]
pub struct Correlator {
    next: AtomicU64,
    pending: DashMap<u64, ()>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh token and record it as pending.
    ///
    /// Tokens are unique for the lifetime of this correlator (and with
    /// it, the session).
    pub fn tag(&self) -> u64 {
        let token = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.pending.insert(token, ());
        token
    }

    /// True exactly once per pending token: the first matching
    /// observation retires it, every later call returns false.
    /// Untagged frames (`None`) are never suppressed.
    pub fn should_suppress(&self, token: Option<u64>) -> bool {
        token.is_some_and(|t| self.pending.remove(&t).is_some())
    }

    /// Drop every pending token. Called on disconnect -- echoes from a
    /// dead session must not suppress anything in the next one.
    pub fn clear(&self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
