// SPDX-License-Identifier: MIT

//! Pending RPC correlation: `request(server_id, message, timeout)` in
//! `spec.md` §4.3, backed by a one-shot channel per in-flight request
//! rather than the callback pair the spec describes in the abstract —
//! the direct idiomatic translation of "resolve/reject callbacks" into
//! Rust.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::RegistryError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request id synchronously, before the request frame is
    /// even sent, so a reply racing in on another task can never arrive
    /// before there is a waiter for it to resolve.
    pub fn insert(&self, request_id: String) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().insert(request_id, tx);
        rx
    }

    /// Await the receiver from [`Self::insert`], rejecting on timeout.
    pub async fn wait(
        &self,
        request_id: &str,
        rx: oneshot::Receiver<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, RegistryError> {
        let result = tokio::time::timeout(timeout.unwrap_or(DEFAULT_TIMEOUT), rx).await;
        self.inner.lock().remove(request_id);

        match result {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(RegistryError::Closed),
            Err(_) => Err(RegistryError::Timeout),
        }
    }

    /// Convenience combining [`Self::insert`] and [`Self::wait`] for
    /// callers that register and await in the same spot.
    pub async fn wait_for(
        &self,
        request_id: String,
        timeout: Option<Duration>,
    ) -> Result<Value, RegistryError> {
        let rx = self.insert(request_id.clone());
        self.wait(&request_id, rx, timeout).await
    }

    /// Resolve a pending request by id. Returns `true` if a waiter was
    /// found (`spec.md` §4.3: "If `payload.request_id` matches a
    /// PendingRequest, resolve it ... and do not dispatch further").
    pub fn resolve(&self, request_id: &str, payload: Value) -> bool {
        if let Some(tx) = self.inner.lock().remove(request_id) {
            tx.send(payload).is_ok()
        } else {
            false
        }
    }

    /// Drop every pending request without resolving them (socket
    /// close): each waiter observes a closed channel and surfaces
    /// [`RegistryError::Closed`].
    pub fn fail_all(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_wakes_the_matching_waiter() {
        let pending = PendingRequests::new();
        let wait_future = pending.wait_for("req-1".to_string(), Some(Duration::from_secs(1)));
        let resolver = async {
            tokio::task::yield_now().await;
            assert!(pending.resolve("req-1", serde_json::json!({"ok": true})));
        };
        let (result, _) = tokio::join!(wait_future, resolver);
        assert_eq!(result.expect("resolved")["ok"], true);
    }

    #[tokio::test]
    async fn unresolved_request_times_out() {
        let pending = PendingRequests::new();
        let result = pending.wait_for("req-2".to_string(), Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(RegistryError::Timeout)));
    }

    #[tokio::test]
    async fn resolving_unknown_id_returns_false() {
        let pending = PendingRequests::new();
        assert!(!pending.resolve("missing", serde_json::json!({})));
    }

    #[tokio::test]
    async fn fail_all_closes_every_waiter() {
        let pending = std::sync::Arc::new(PendingRequests::new());
        let wait_future = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.wait_for("req-3".to_string(), Some(Duration::from_secs(5))).await })
        };
        tokio::task::yield_now().await;
        pending.fail_all();
        let result = wait_future.await.expect("join");
        assert!(matches!(result, Err(RegistryError::Closed)));
    }
}
