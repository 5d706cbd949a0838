//! Inventory and allocation records.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Targeting metadata attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
}

/// An inventory item discovered from a sales agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sales_agent_id: String,
    #[serde(default)]
    pub floor_price: Option<f64>,
    #[serde(default)]
    pub recommended_price: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Targeting>,
}

impl Product {
    pub fn new(id: impl Into<String>, sales_agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sales_agent_id: sales_agent_id.into(),
            floor_price: None,
            recommended_price: None,
            name: None,
            targeting: None,
        }
    }

    pub fn with_floor_price(mut self, floor_price: f64) -> Self {
        self.floor_price = Some(floor_price);
        self
    }

    /// Floor price, with a missing value read as zero.
    pub fn floor(&self) -> f64 {
        self.floor_price.unwrap_or(0.0)
    }
}

/// Stable ascending sort by floor price.
pub fn sort_by_floor_price(products: &mut [Product]) {
    products.sort_by(|a, b| a.floor().total_cmp(&b.floor()));
}

/// Mean floor price, zero for an empty list.
pub fn average_floor_price(products: &[Product]) -> f64 {
    if products.is_empty() {
        return 0.0;
    }
    products.iter().map(Product::floor).sum::<f64>() / products.len() as f64
}

/// A monetary amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Budget {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn usd(amount: f64) -> Self {
        Self::new(amount, DEFAULT_CURRENCY)
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Budget assigned to one selected product.
///
/// Serializes in the shape `media_buy_create` expects for its products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    #[serde(rename = "mediaProductId")]
    pub product_id: String,
    pub sales_agent_id: String,
    pub budget_amount: f64,
    #[serde(rename = "budgetCurrency")]
    pub currency: String,
    /// Carried from the product's floor price.
    #[serde(rename = "pricingCpm")]
    pub price_per_unit: f64,
}
