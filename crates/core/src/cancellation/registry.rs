use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vkrpc_domain::Credential;

static SHARED: Lazy<Arc<CancellationRegistry>> = Lazy::new(|| Arc::new(CancellationRegistry::new()));
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Build a registry key for one physical call.
///
/// Composed of the credential fingerprint, a wall-clock timestamp and a
/// process-wide sequence number, so two calls started in the same nanosecond
/// with the same token still get distinct keys.
pub fn call_key(credential: &Credential) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{nanos:x}_{seq:x}", credential.fingerprint())
}

/// Table of in-flight physical calls, keyed by [`call_key`].
///
/// The number of registered entries equals the number of calls currently on
/// the wire. After [`shutdown_all`](Self::shutdown_all) the registry is
/// permanently in the exited state and transports must refuse new calls.
///
/// Clients built without an explicit registry use [`shared`](Self::shared).
/// Pass one to the builder to scope shutdown to a group of clients:
///
/// ```
/// # use std::sync::Arc;
/// # use vkrpc_core::cancellation::CancellationRegistry;
/// let registry = Arc::new(CancellationRegistry::new());
/// assert!(!registry.is_exited());
/// registry.shutdown_all();
/// assert!(registry.exited_token().is_cancelled());
/// ```
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    exited: CancellationToken,
    handles: Mutex<HashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by clients that were not given one.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn register(&self, key: impl Into<String>, token: CancellationToken) {
        let key = key.into();
        let mut handles = self.handles.lock();
        if handles.insert(key.clone(), token).is_some() {
            warn!(key = %key, "cancellation key registered twice; previous handle replaced");
        }
    }

    /// Remove a handle. Absent keys are ignored: cleanup may run after a
    /// shutdown already observed the entry.
    pub fn unregister(&self, key: &str) {
        self.handles.lock().remove(key);
    }

    /// Flip the exited flag, then cancel every registered call.
    ///
    /// Handles stay registered until their owning call unregisters them.
    /// Returns the number of calls that were signalled.
    pub fn shutdown_all(&self) -> usize {
        self.exited.cancel();

        let handles = self.handles.lock();
        for token in handles.values() {
            token.cancel();
        }
        info!(in_flight = handles.len(), "cancellation registry shut down");
        handles.len()
    }

    pub fn is_exited(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Token cancelled by [`shutdown_all`](Self::shutdown_all). Lets work
    /// that is not on the wire (retry sleeps) wake up on shutdown.
    pub fn exited_token(&self) -> CancellationToken {
        self.exited.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.handles.lock().len()
    }

    /// Register a fresh child of `parent` for one physical call.
    ///
    /// The returned guard unregisters on drop, so every exit path (success,
    /// error, cancellation, panic unwinding) removes the handle.
    pub fn enroll(self: &Arc<Self>, credential: &Credential, parent: &CancellationToken) -> InFlightGuard {
        let key = call_key(credential);
        let token = parent.child_token();
        self.register(key.clone(), token.clone());
        debug!(key = %key, "physical call registered");
        InFlightGuard { registry: Arc::clone(self), key, token }
    }
}

/// Scoped registration of one in-flight call.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<CancellationRegistry>,
    key: String,
    token: CancellationToken,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.key);
    }
}
