//! Channel-grouped proposal generation for outcome agents.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::product::DEFAULT_CURRENCY;

/// Revenue share charged on every proposal.
pub const REVSHARE_RATE: f64 = 0.15;

/// Largest floor price accepted, as a share of the budget ceiling.
pub const MAX_FLOOR_SHARE: f64 = 0.1;

/// Capacity multiplier over summed floor prices when no ceiling is given.
pub const FLOOR_CAPACITY_MULTIPLIER: f64 = 100.0;

/// Channel key for products that declare none.
pub const UNKNOWN_CHANNEL: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Targeting declared by a candidate product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductTargeting {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A candidate product as forwarded by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalProduct {
    #[serde(default)]
    pub sales_agent_url: Option<String>,
    #[serde(default)]
    pub product_ref: Option<String>,
    #[serde(default)]
    pub pricing_option_id: Option<String>,
    #[serde(default)]
    pub floor_price: Option<f64>,
    #[serde(default)]
    pub floor_price_currency: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub targeting: Option<ProductTargeting>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProposalProduct {
    fn channels(&self) -> &[String] {
        self.targeting.as_ref().map_or(&[], |t| t.channels.as_slice())
    }

    fn countries(&self) -> &[String] {
        self.targeting.as_ref().map_or(&[], |t| t.countries.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequest {
    pub campaign_id: String,
    #[serde(default)]
    pub seat_id: String,
    #[serde(default)]
    pub budget_range: Option<BudgetRange>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub products: Vec<ProposalProduct>,
    #[serde(default)]
    pub property_list_ids: Vec<i64>,
}

impl ProposalRequest {
    /// The range maximum unless it is absent or zero. A negative maximum
    /// still counts and leaves no capacity.
    fn budget_ceiling(&self) -> Option<f64> {
        self.budget_range
            .as_ref()
            .and_then(|r| r.max)
            .filter(|max| *max != 0.0 && !max.is_nan())
    }

    fn currency(&self) -> String {
        self.budget_range
            .as_ref()
            .and_then(|r| r.currency.clone())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMethod {
    Revshare,
    CostPerUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalPricing {
    pub method: PricingMethod,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub proposal_id: String,
    pub execution: String,
    pub budget_capacity: f64,
    pub pricing: ProposalPricing,
    pub sku: String,
    #[serde(rename = "additional_info")]
    pub additional_info: Value,
}

/// Drop products whose targeting or floor price rule them out.
///
/// A product is only rejected on channel or country when it declares values
/// and none of them match; undeclared targeting passes.
pub fn filter_products<'a>(
    products: &'a [ProposalProduct],
    request: &ProposalRequest,
) -> Vec<&'a ProposalProduct> {
    let ceiling = request.budget_ceiling();

    products
        .iter()
        .filter(|product| {
            if !matches_any(product.channels(), &request.channels) {
                return false;
            }
            if !matches_any(product.countries(), &request.countries) {
                return false;
            }
            match (ceiling, product.floor_price) {
                (Some(max), Some(floor)) if floor != 0.0 => floor <= max * MAX_FLOOR_SHARE,
                _ => true,
            }
        })
        .collect()
}

fn matches_any(declared: &[String], wanted: &[String]) -> bool {
    wanted.is_empty() || declared.is_empty() || wanted.iter().any(|w| declared.contains(w))
}

/// Group products by channel in first-seen order.
///
/// A product with several channels joins each of their groups.
pub fn group_by_channel<'a>(
    products: &[&'a ProposalProduct],
) -> Vec<(String, Vec<&'a ProposalProduct>)> {
    let mut groups: Vec<(String, Vec<&'a ProposalProduct>)> = Vec::new();

    for product in products {
        let channels = match product.channels() {
            [] => vec![UNKNOWN_CHANNEL.to_string()],
            declared => declared.to_vec(),
        };
        for channel in channels {
            match groups.iter_mut().find(|(name, _)| *name == channel) {
                Some((_, members)) => members.push(product),
                None => groups.push((channel, vec![product])),
            }
        }
    }

    groups
}

/// Budget ceiling when given, else a multiple of the summed floor prices.
pub fn budget_capacity(products: &[&ProposalProduct], request: &ProposalRequest) -> f64 {
    if let Some(max) = request.budget_ceiling() {
        return max;
    }
    let floor_total: f64 = products.iter().filter_map(|p| p.floor_price).sum();
    floor_total * FLOOR_CAPACITY_MULTIPLIER
}

/// One proposal per channel represented among the eligible products.
pub fn generate_proposals(request: &ProposalRequest) -> Vec<Proposal> {
    let eligible = filter_products(&request.products, request);
    debug!(
        campaign = %request.campaign_id,
        offered = request.products.len(),
        eligible = eligible.len(),
        "filtered products"
    );

    group_by_channel(&eligible)
        .into_iter()
        .filter_map(|(channel, members)| {
            let capacity = budget_capacity(&members, request);
            if capacity <= 0.0 {
                return None;
            }
            Some(Proposal {
                proposal_id: proposal_id(&request.campaign_id, &channel),
                execution: format!(
                    "Optimized {channel} campaign across {} products. Budget allocation \
                     strategy: maximize reach while maintaining quality thresholds.",
                    members.len()
                ),
                budget_capacity: capacity,
                pricing: ProposalPricing {
                    method: PricingMethod::Revshare,
                    rate: REVSHARE_RATE,
                    unit: None,
                    currency: request.currency(),
                },
                sku: format!("outcome-agent-{}", sku_slug(&channel)),
                additional_info: json!({
                    "channel": channel,
                    "productCount": members.len(),
                    "products": members
                        .iter()
                        .map(|p| json!({
                            "product_ref": p.product_ref,
                            "sales_agent_url": p.sales_agent_url,
                            "pricing_option_id": p.pricing_option_id,
                        }))
                        .collect::<Vec<_>>(),
                }),
            })
        })
        .collect()
}

fn proposal_id(campaign_id: &str, channel: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("prop-{campaign_id}-{channel}-{millis}-{suffix}")
}

fn sku_slug(channel: &str) -> String {
    channel
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}
