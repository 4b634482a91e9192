//! Live connection accounting for graceful stop.
//!
//! Every accepted connection holds a [`ConnectionGuard`]. The tracker
//! publishes the live count on a watch channel, so draining is a wait on
//! "count == 0" rather than a poll.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection number, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts connections that are still open.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    live: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            live: Arc::new(watch::channel(0).0),
        }
    }

    /// Register a connection from `peer`. It counts as live until the
    /// returned guard is dropped.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        self.live.send_modify(|n| *n += 1);
        let guard = ConnectionGuard {
            live: Arc::clone(&self.live),
            id: ConnectionId::next(),
            peer,
        };
        tracing::trace!(connection_id = %guard.id, peer_addr = %peer, "Connection opened");
        guard
    }

    pub fn active_count(&self) -> usize {
        *self.live.borrow()
    }

    /// Wait until every connection has closed or `timeout` elapses.
    /// Returns whether the tracker drained.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.live.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await;
        matches!(drained, Ok(Ok(_)))
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps its connection counted while alive.
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<watch::Sender<usize>>,
    id: ConnectionId,
    peer: SocketAddr,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.live.send_modify(|n| *n = n.saturating_sub(1));
        tracing::trace!(connection_id = %self.id, peer_addr = %self.peer, "Connection closed");
    }
}
