//! Outcome agent: channel proposals and assignment acceptance.

use allocation::generate_proposals;
use allocation::{Proposal, ProposalRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::acknowledgement::Acknowledgement;
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetProposalsResponse {
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignContext {
    /// Kept raw so a missing or non-numeric budget reaches validation.
    #[serde(default)]
    pub budget: Value,
    #[serde(default)]
    pub budget_currency: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub creatives: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptProposalRequest {
    #[serde(default)]
    pub tactic_id: String,
    #[serde(default)]
    pub proposal_id: Option<String>,
    #[serde(default)]
    pub campaign_context: Option<CampaignContext>,
    #[serde(default)]
    pub brand_agent_id: Option<String>,
    #[serde(default)]
    pub seat_id: Option<String>,
    #[serde(default)]
    pub custom_fields: Option<Map<String, Value>>,
    #[serde(default, rename = "additional_info")]
    pub additional_info: Option<Value>,
}

impl CampaignContext {
    /// The budget when it is a positive number.
    pub fn budget_amount(&self) -> Option<f64> {
        self.budget.as_f64().filter(|amount| *amount > 0.0)
    }
}

impl AcceptProposalRequest {
    /// Pre-flight checks before an assignment is taken on.
    ///
    /// Returns the context together with its validated budget.
    pub fn validate(&self) -> Result<(&CampaignContext, f64), ValidationError> {
        let context = match &self.campaign_context {
            Some(context) if !self.tactic_id.trim().is_empty() => context,
            _ => {
                return Err(ValidationError::new(
                    "Missing required fields: tacticId or campaignContext",
                ));
            }
        };
        let budget = context
            .budget_amount()
            .ok_or_else(|| ValidationError::new("Budget must be greater than 0"))?;
        Ok((context, budget))
    }
}

/// One proposal per channel among the offered products.
pub fn get_proposals(request: &ProposalRequest) -> GetProposalsResponse {
    info!(
        campaign = %request.campaign_id,
        seat = %request.seat_id,
        products = request.products.len(),
        "proposal request"
    );

    if request.products.is_empty() {
        return GetProposalsResponse::default();
    }

    let proposals = generate_proposals(request);
    info!(campaign = %request.campaign_id, proposals = proposals.len(), "generated proposals");
    GetProposalsResponse { proposals }
}

/// Accept any assignment that passes validation.
pub fn accept_proposal(request: &AcceptProposalRequest) -> Result<Acknowledgement, ValidationError> {
    let (context, budget) = request.validate().inspect_err(|err| {
        warn!(tactic = %request.tactic_id, reason = %err, "declining assignment");
    })?;

    info!(
        tactic = %request.tactic_id,
        proposal = ?request.proposal_id,
        brand_agent = ?request.brand_agent_id,
        budget,
        currency = context.budget_currency.as_deref().unwrap_or(allocation::DEFAULT_CURRENCY),
        channel = ?context.channel,
        creatives = context.creatives.len(),
        "assignment accepted"
    );
    Ok(Acknowledgement::accepted())
}
