//! Per-connection identity and bookkeeping.
//!
//! Every upgraded websocket gets a [`ConnectionId`] that tags its log lines,
//! and a [`ConnectionGuard`] that keeps the listener's live count and the
//! `kws_active_connections` gauge honest until the bridge is torn down.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide connection number, rendered as `conn-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counts {
    live: AtomicUsize,
    accepted: AtomicU64,
}

/// Live and lifetime websocket counts for one listener.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counts: Arc<Counts>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted websocket from `peer`.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        self.counts.live.fetch_add(1, Ordering::SeqCst);
        self.counts.accepted.fetch_add(1, Ordering::Relaxed);
        metrics::connection_opened();

        ConnectionGuard {
            counts: Arc::clone(&self.counts),
            id: ConnectionId::next(),
            peer,
            opened: Instant::now(),
        }
    }

    /// Websockets currently bridged.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Websockets accepted since the listener started.
    pub fn accepted(&self) -> u64 {
        self.counts.accepted.load(Ordering::Relaxed)
    }
}

/// Held by a bridge for as long as its websocket is open.
#[derive(Debug)]
pub struct ConnectionGuard {
    counts: Arc<Counts>,
    id: ConnectionId,
    peer: SocketAddr,
    opened: Instant,
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
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_released();
        tracing::debug!(
            connection_id = %self.id,
            peer = %self.peer,
            open_for = ?self.opened.elapsed(),
            "Connection released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn ids_are_distinct_and_labelled() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(a < b);
        assert_eq!(a.to_string(), format!("conn-{}", a.0));
    }

    #[test]
    fn guards_track_live_connections() {
        let tracker = ConnectionTracker::new();
        let first = tracker.track(peer(1000));
        let second = tracker.clone().track(peer(1001));
        assert_eq!(tracker.live(), 2);
        assert_ne!(first.id(), second.id());
        assert_eq!(second.peer(), peer(1001));

        drop(first);
        assert_eq!(tracker.live(), 1);
        drop(second);
        assert_eq!(tracker.live(), 0);
        assert_eq!(tracker.accepted(), 2);
    }
}
