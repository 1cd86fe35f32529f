//! Server lock registry
//!
//! Every server id maps to one [`ServerGate`] for the lifetime of the
//! process. A gate lets a single lifecycle operation be in flight for its
//! server; operations on other servers never touch it. The map itself is
//! guarded by a short-held lock used only for insert-if-absent, never while
//! waiting on a gate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard, OwnedMutexGuard};
use tracing::debug;

/// Per-server wait primitive
#[derive(Debug)]
pub struct ServerGate {
    server_id: String,
    slot: Arc<AsyncMutex<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl ServerGate {
    fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            slot: Arc::new(AsyncMutex::new(())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Wait until no operation is in flight for this server, then mark one.
    ///
    /// Waiting and marking happen as one step, so two callers can never both
    /// observe an idle server. Waiters are not ordered by arrival.
    pub async fn enter(&self) -> InFlightGuard {
        if self.in_flight() > 0 {
            debug!(server_id = %self.server_id, "Waiting for in-flight operation");
        }
        let slot = Arc::clone(&self.slot).lock_owned().await;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            server_id: self.server_id.clone(),
            in_flight: Arc::clone(&self.in_flight),
            _slot: slot,
        }
    }

    /// Number of operations currently in flight (0 or 1)
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }
}

/// Marks an operation as in flight; dropping it releases the server
///
/// The release runs on every exit path, including errors and a dropped
/// future.
#[derive(Debug)]
pub struct InFlightGuard {
    server_id: String,
    in_flight: Arc<AtomicUsize>,
    _slot: OwnedMutexGuard<()>,
}

impl InFlightGuard {
    pub fn server_id(&self) -> &str {
        &self.server_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug!(server_id = %self.server_id, "Released server");
    }
}

/// Map from server id to its gate
#[derive(Debug, Default)]
pub struct ServerLocks {
    gates: Mutex<HashMap<String, Arc<ServerGate>>>,
}

impl ServerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or lazily create the gate for `server_id`. Never blocks on the
    /// gate itself.
    pub fn acquire(&self, server_id: &str) -> Arc<ServerGate> {
        let mut gates = self
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let gate = gates.entry(server_id.to_string()).or_insert_with(|| {
            debug!(server_id = %server_id, "Registered server gate");
            Arc::new(ServerGate::new(server_id))
        });
        Arc::clone(gate)
    }

    pub fn len(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locks shared by every lifecycle operation of a process
///
/// Holds the server lock registry and the exclusion lock that serializes
/// direct control-plane calls.
#[derive(Debug, Default)]
pub struct LockSet {
    servers: ServerLocks,
    api: AsyncMutex<()>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide lock set
    pub fn global() -> Arc<LockSet> {
        static GLOBAL: OnceLock<Arc<LockSet>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LockSet::new())))
    }

    pub fn servers(&self) -> &ServerLocks {
        &self.servers
    }

    /// Take the control-plane lock, or nothing when calls run unserialized
    pub async fn api_call(&self, serialize: bool) -> Option<AsyncMutexGuard<'_, ()>> {
        if serialize {
            Some(self.api.lock().await)
        } else {
            None
        }
    }
}
