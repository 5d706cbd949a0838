//! Passthrough media agent.
//!
//! Proposes a single tactic covering all discovered inventory and, once
//! assigned a tactic, funds the cheapest products with equal shares of the
//! overallocated budget.

use std::sync::Arc;

use allocation::proposals::BudgetRange;
use allocation::{
    AllocationConfig, AllocationEngine, Budget, DEFAULT_CURRENCY, HoldAllocations,
    ReallocationPolicy, TacticAllocation, TacticEvent, TacticFeedback, average_floor_price,
    sort_by_floor_price,
};
use client::{DataList, Session};
use mcp::{HttpTransport, Transport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::Result;
use crate::acknowledgement::Acknowledgement;
use crate::discovery::discover_products;
use crate::ledger::TacticLedger;

pub const PASSTHROUGH_SKU: &str = "simple-passthrough";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTacticsRequest {
    pub campaign_id: String,
    #[serde(default)]
    pub budget_range: Option<BudgetRange>,
    #[serde(default)]
    pub seat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticPricing {
    pub method: String,
    pub estimated_cpm: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTactic {
    pub tactic_id: String,
    pub execution: String,
    pub budget_capacity: f64,
    pub pricing: TacticPricing,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTactics {
    pub proposed_tactics: Vec<ProposedTactic>,
}

/// Budget as sent by the platform: a bare amount or an amount with currency.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BudgetValue {
    Amount(f64),
    Detailed {
        amount: f64,
        #[serde(default)]
        currency: Option<String>,
    },
}

impl BudgetValue {
    pub fn to_budget(&self, default_currency: &str) -> Budget {
        match self {
            Self::Amount(amount) => Budget::new(*amount, default_currency),
            Self::Detailed { amount, currency } => Budget::new(
                *amount,
                currency.as_deref().unwrap_or(default_currency),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TacticContext {
    #[serde(default)]
    pub budget: Option<BudgetValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageTacticRequest {
    pub tactic_id: String,
    #[serde(default)]
    pub tactic_context: TacticContext,
    #[serde(default)]
    pub brand_agent_id: Option<String>,
    #[serde(default)]
    pub seat_id: Option<String>,
}

/// A JSON-patch style update to a tactic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticPatch {
    pub tactic_id: String,
    #[serde(default)]
    pub patch: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticFeedbackRequest {
    pub tactic_id: String,
    #[serde(flatten)]
    pub feedback: TacticFeedback,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingComplete {
    pub tactic_id: String,
    #[serde(default)]
    pub reporting_data: Value,
}

/// Media agent that splits tactic budgets across the cheapest inventory.
pub struct SimpleMediaAgent<T: Transport = HttpTransport> {
    session: Arc<Session<T>>,
    engine: AllocationEngine,
    ledger: TacticLedger,
    policy: Arc<dyn ReallocationPolicy>,
}

impl<T: Transport> SimpleMediaAgent<T> {
    pub fn new(session: Arc<Session<T>>, config: AllocationConfig) -> Result<Self> {
        Ok(Self {
            session,
            engine: AllocationEngine::new(config)?,
            ledger: TacticLedger::new(),
            policy: Arc::new(HoldAllocations),
        })
    }

    /// Replace the policy consulted on tactic events.
    pub fn with_policy(mut self, policy: Arc<dyn ReallocationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &TacticLedger {
        &self.ledger
    }

    pub async fn get_proposed_tactics(
        &self,
        request: &ProposedTacticsRequest,
    ) -> Result<ProposedTactics> {
        let discovery = discover_products(&self.session).await?;
        if discovery.products.is_empty() {
            return Err(crate::Error::NoInventory {
                agents: discovery.agents,
            });
        }

        let mut products = discovery.products;
        sort_by_floor_price(&mut products);

        let tactic = ProposedTactic {
            tactic_id: format!("{PASSTHROUGH_SKU}-{}", request.campaign_id),
            execution: format!(
                "Passthrough strategy: distribute budget across {} products based on floor \
                 prices with {}% overallocation.",
                products.len(),
                self.engine.config().overallocation_percent
            ),
            budget_capacity: request
                .budget_range
                .as_ref()
                .and_then(|r| r.max)
                .unwrap_or(0.0),
            pricing: TacticPricing {
                method: "passthrough".to_string(),
                estimated_cpm: average_floor_price(&products),
                currency: DEFAULT_CURRENCY.to_string(),
            },
            sku: PASSTHROUGH_SKU.to_string(),
        };

        info!(campaign = %request.campaign_id, products = products.len(), "proposed tactic");
        Ok(ProposedTactics {
            proposed_tactics: vec![tactic],
        })
    }

    /// Allocate the tactic budget and issue one media buy per allocation.
    ///
    /// Stops at the first media buy that cannot be created.
    pub async fn manage_tactic(&self, request: &ManageTacticRequest) -> Result<Acknowledgement> {
        let tactic_id = request.tactic_id.as_str();
        info!(tactic = tactic_id, "managing tactic");

        let discovery = discover_products(&self.session).await?;
        let mut products = discovery.products;
        sort_by_floor_price(&mut products);

        let currency = self.engine.config().currency.as_str();
        let budget = request
            .tactic_context
            .budget
            .as_ref()
            .map_or_else(|| Budget::new(0.0, currency), |b| b.to_budget(currency));
        let allocations = self.engine.allocate(&products, &budget);

        self.ledger
            .insert(
                tactic_id,
                TacticAllocation {
                    products,
                    allocations: allocations.clone(),
                    budget,
                },
            )
            .await;

        for allocation in &allocations {
            let created: client::Result<Value> = self
                .session
                .media_buys()
                .create(json!({
                    "tacticId": tactic_id,
                    "name": format!("Media Buy - {}", allocation.product_id),
                    "products": [allocation],
                    "budget": {
                        "amount": allocation.budget_amount,
                        "currency": allocation.currency,
                    },
                }))
                .await;
            if let Err(err) = created {
                error!(
                    tactic = tactic_id,
                    product = %allocation.product_id,
                    error = %err,
                    "media buy creation failed"
                );
                return Ok(Acknowledgement::declined(format!(
                    "Failed to create media buy for product {}",
                    allocation.product_id
                )));
            }
        }

        info!(tactic = tactic_id, media_buys = allocations.len(), "tactic funded");
        Ok(Acknowledgement::accepted().with_media_buys_created(allocations.len()))
    }

    pub async fn tactic_context_updated(&self, update: &TacticPatch) -> Acknowledgement {
        let Some(change) = budget_patch(&update.patch) else {
            info!(tactic = %update.tactic_id, ops = update.patch.len(), "tactic context updated");
            return Acknowledgement::accepted();
        };

        let Some(current) = self.ledger.get(&update.tactic_id).await else {
            return Acknowledgement::accepted();
        };
        info!(tactic = %update.tactic_id, "tactic budget changed");

        let event = TacticEvent::ContextUpdated {
            patch: update.patch.clone(),
            budget: patched_budget(change, &current.budget.currency),
        };
        self.reallocate(&update.tactic_id, &current, &event).await;
        Acknowledgement::accepted()
    }

    pub async fn tactic_creatives_updated(&self, update: &TacticPatch) -> Acknowledgement {
        info!(tactic = %update.tactic_id, ops = update.patch.len(), "tactic creatives updated");
        let event = TacticEvent::CreativesUpdated {
            patch: update.patch.clone(),
        };
        self.route_event(&update.tactic_id, &event).await;
        Acknowledgement::accepted()
    }

    pub async fn tactic_feedback(&self, request: &TacticFeedbackRequest) -> Acknowledgement {
        info!(
            tactic = %request.tactic_id,
            delivery_index = ?request.feedback.delivery_index,
            performance_index = ?request.feedback.performance_index,
            "tactic feedback"
        );
        let event = TacticEvent::Feedback(request.feedback.clone());
        self.route_event(&request.tactic_id, &event).await;
        Acknowledgement::accepted()
    }

    /// Daily reporting finished; hand the tactic's media buys to the policy.
    pub async fn reporting_complete(&self, report: &ReportingComplete) -> Result<Acknowledgement> {
        let Some(current) = self.ledger.get(&report.tactic_id).await else {
            return Ok(Acknowledgement::accepted().with_message("Tactic not found"));
        };

        let media_buys: DataList<Value> = self
            .session
            .media_buys()
            .list(json!({ "tacticId": report.tactic_id }))
            .await?;
        info!(
            tactic = %report.tactic_id,
            media_buys = media_buys.data.len(),
            "reporting complete"
        );

        let event = TacticEvent::ReportingComplete {
            reporting_data: report.reporting_data.clone(),
            media_buys: media_buys.data,
        };
        self.reallocate(&report.tactic_id, &current, &event).await;
        Ok(Acknowledgement::accepted().with_message("Reallocation triggered"))
    }

    async fn route_event(&self, tactic_id: &str, event: &TacticEvent) {
        if let Some(current) = self.ledger.get(tactic_id).await {
            self.reallocate(tactic_id, &current, event).await;
        }
    }

    async fn reallocate(&self, tactic_id: &str, current: &TacticAllocation, event: &TacticEvent) {
        if let Some(next) = self.policy.reallocate(tactic_id, current, event) {
            info!(
                tactic = tactic_id,
                event = event.kind(),
                allocations = next.allocations.len(),
                "allocation replaced"
            );
            self.ledger.insert(tactic_id, next).await;
        }
    }
}

/// First patch operation touching the budget.
fn budget_patch(patch: &[Value]) -> Option<&Value> {
    patch.iter().find(|op| {
        op.get("path")
            .and_then(Value::as_str)
            .is_some_and(|path| path.starts_with("/budget"))
    })
}

/// New budget carried by a budget patch operation, when it can be read.
fn patched_budget(op: &Value, currency: &str) -> Option<Budget> {
    let value = op.get("value")?;
    match op.get("path").and_then(Value::as_str)? {
        "/budget" => serde_json::from_value::<BudgetValue>(value.clone())
            .ok()
            .map(|b| b.to_budget(currency)),
        "/budget/amount" => value.as_f64().map(|amount| Budget::new(amount, currency)),
        _ => None,
    }
}
