use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Named logical operations, each with an at-most-one-in-flight invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    ProcessOrders,
    UpdateInventory,
    GenerateReport,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::ProcessOrders, Slot::UpdateInventory, Slot::GenerateReport];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::ProcessOrders => "process_orders",
            Slot::UpdateInventory => "update_inventory",
            Slot::GenerateReport => "generate_report",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Slot::ProcessOrders => "/api/process_orders",
            Slot::UpdateInventory => "/api/update_inventory",
            Slot::GenerateReport => "/api/generate_report",
        }
    }
}

/// Tracks at most one live cancellation handle per slot. Starting a new
/// request supersedes (cancels) the previous one; superseded requests are
/// abandoned, never queued.
#[derive(Clone, Default)]
pub struct SlotRegistry {
    inner: Arc<Mutex<HashMap<Slot, CancellationToken>>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and replace whatever handle the slot currently holds, then
    /// hand out the new one.
    pub async fn begin(&self, slot: Slot) -> CancellationToken {
        let mut map = self.inner.lock().await;
        if let Some(stale) = map.remove(&slot) {
            debug!(slot = slot.as_str(), "superseding in-flight request");
            stale.cancel();
        }
        let token = CancellationToken::new();
        map.insert(slot, token.clone());
        token
    }

    /// Clear the handle for a completed, failed, or aborted request.
    pub async fn remove(&self, slot: Slot) {
        self.inner.lock().await.remove(&slot);
    }

    pub async fn cancel(&self, slot: Slot) -> bool {
        match self.inner.lock().await.remove(&slot) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn cancel_all(&self) -> usize {
        let mut map = self.inner.lock().await;
        let count = map.len();
        for (_, token) in map.drain() {
            token.cancel();
        }
        count
    }

    pub async fn is_active(&self, slot: Slot) -> bool {
        self.inner.lock().await.contains_key(&slot)
    }
}
