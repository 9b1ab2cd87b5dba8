//! Debounced lookups bound to the latest input.
//!
//! Each request waits out a debounce delay before running. If a newer
//! request was issued in the meantime, or while the call was in flight,
//! the older request yields `None` and its result is dropped.

use algotx_rpc::{AssetInfo, NodeRpc, RpcError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default debounce delay for typing-driven lookups.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct LatestOnly {
    delay: Duration,
    generation: AtomicU64,
}

impl Default for LatestOnly {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl LatestOnly {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Run `request` unless superseded before or during the call.
    pub async fn run<F, Fut, T>(&self, request: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.delay).await;
        if !self.is_current(ticket) {
            log::debug!("Lookup {} superseded before start", ticket);
            return None;
        }

        let result = request().await;
        if !self.is_current(ticket) {
            log::debug!("Lookup {} superseded, result dropped", ticket);
            return None;
        }
        Some(result)
    }

    /// Supersede every pending request.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

/// Asset metadata lookups for an asset id being edited.
pub struct AssetLookup {
    node: NodeRpc,
    latest: LatestOnly,
}

impl AssetLookup {
    pub fn new(node: NodeRpc, delay: Duration) -> Self {
        Self {
            node,
            latest: LatestOnly::new(delay),
        }
    }

    /// `None` when a newer lookup replaced this one.
    pub async fn lookup(&self, asset_id: u64) -> Option<Result<AssetInfo, RpcError>> {
        self.latest.run(|| self.node.asset_info(asset_id)).await
    }

    pub fn cancel(&self) {
        self.latest.cancel();
    }
}
