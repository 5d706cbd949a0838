//! Reallocation hooks for live tactics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::engine::AllocationEngine;
use crate::product::{Allocation, Budget, Product};

/// What a tactic was funded with when it was last (re)allocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticAllocation {
    pub products: Vec<Product>,
    pub allocations: Vec<Allocation>,
    pub budget: Budget,
}

/// Delivery and performance indices reported for a tactic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticFeedback {
    #[serde(default)]
    pub delivery_index: Option<f64>,
    #[serde(default)]
    pub performance_index: Option<f64>,
}

/// Events that may prompt a change to a tactic's allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TacticEvent {
    /// The tactic context changed; `budget` is set when a `/budget` path
    /// was patched and the new amount could be read.
    ContextUpdated {
        patch: Vec<Value>,
        budget: Option<Budget>,
    },
    CreativesUpdated { patch: Vec<Value> },
    Feedback(TacticFeedback),
    ReportingComplete {
        reporting_data: Value,
        media_buys: Vec<Value>,
    },
}

impl TacticEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContextUpdated { .. } => "context_updated",
            Self::CreativesUpdated { .. } => "creatives_updated",
            Self::Feedback(_) => "feedback",
            Self::ReportingComplete { .. } => "reporting_complete",
        }
    }
}

/// Decides whether a tactic event changes the allocation set.
///
/// Returning `Some` replaces the stored allocation for the tactic.
pub trait ReallocationPolicy: Send + Sync {
    fn reallocate(
        &self,
        tactic_id: &str,
        current: &TacticAllocation,
        event: &TacticEvent,
    ) -> Option<TacticAllocation>;
}

/// Records events and never changes allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldAllocations;

impl ReallocationPolicy for HoldAllocations {
    fn reallocate(
        &self,
        tactic_id: &str,
        current: &TacticAllocation,
        event: &TacticEvent,
    ) -> Option<TacticAllocation> {
        info!(
            tactic = tactic_id,
            event = event.kind(),
            allocations = current.allocations.len(),
            "holding allocation"
        );
        None
    }
}

/// Reruns the engine over the stored inventory when the budget changes.
#[derive(Debug, Clone)]
pub struct RebalanceOnBudgetChange {
    engine: AllocationEngine,
}

impl RebalanceOnBudgetChange {
    pub fn new(engine: AllocationEngine) -> Self {
        Self { engine }
    }
}

impl ReallocationPolicy for RebalanceOnBudgetChange {
    fn reallocate(
        &self,
        tactic_id: &str,
        current: &TacticAllocation,
        event: &TacticEvent,
    ) -> Option<TacticAllocation> {
        let TacticEvent::ContextUpdated {
            budget: Some(budget),
            ..
        } = event
        else {
            return None;
        };
        if *budget == current.budget {
            return None;
        }

        let allocations = self.engine.allocate(&current.products, budget);
        info!(
            tactic = tactic_id,
            from = current.budget.amount,
            to = budget.amount,
            funded = allocations.len(),
            "rebalanced allocation"
        );
        Some(TacticAllocation {
            products: current.products.clone(),
            allocations,
            budget: budget.clone(),
        })
    }
}
