//! In-memory record of allocations per tactic.

use std::collections::HashMap;

use allocation::TacticAllocation;
use tokio::sync::RwLock;

/// Allocation sets keyed by tactic id.
#[derive(Debug, Default)]
pub struct TacticLedger {
    tactics: RwLock<HashMap<String, TacticAllocation>>,
}

impl TacticLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `allocation` for `tactic_id`, returning the one it replaced.
    pub async fn insert(
        &self,
        tactic_id: impl Into<String>,
        allocation: TacticAllocation,
    ) -> Option<TacticAllocation> {
        self.tactics.write().await.insert(tactic_id.into(), allocation)
    }

    /// Copy of the allocation set held for `tactic_id`.
    pub async fn get(&self, tactic_id: &str) -> Option<TacticAllocation> {
        self.tactics.read().await.get(tactic_id).cloned()
    }

    /// Whether `tactic_id` has an allocation set.
    pub async fn contains(&self, tactic_id: &str) -> bool {
        self.tactics.read().await.contains_key(tactic_id)
    }

    /// Number of tactics tracked.
    pub async fn len(&self) -> usize {
        self.tactics.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tactics.read().await.is_empty()
    }
}
