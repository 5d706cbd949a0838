//! Equal-split-of-cheapest-N budget allocation.
//!
//! Products are funded cheapest first. The number funded is capped so that
//! each receives at least the minimum daily budget over the planning
//! horizon, and the overallocated budget is split evenly among them. This is
//! a placeholder strategy; a pricing optimizer can replace it behind the
//! same inputs and outputs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::product::{Allocation, Budget, DEFAULT_CURRENCY, Product, sort_by_floor_price};
use crate::{Error, Result};

/// Tuning for [`AllocationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AllocationConfig {
    /// Smallest daily spend worth funding a product at.
    pub min_daily_budget: f64,
    /// Extra budget committed to offset under-delivery, in percent.
    pub overallocation_percent: f64,
    /// Horizon the daily minimum is measured over.
    pub planning_days: u32,
    /// Currency used when the budget does not name one.
    pub currency: String,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_daily_budget: 100.0,
            overallocation_percent: 40.0,
            planning_days: 30,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_daily_budget.is_finite() && self.min_daily_budget > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_daily_budget must be positive, got {}",
                self.min_daily_budget
            )));
        }
        if !(self.overallocation_percent.is_finite() && self.overallocation_percent >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "overallocation_percent must be non-negative, got {}",
                self.overallocation_percent
            )));
        }
        if self.planning_days == 0 {
            return Err(Error::InvalidConfig(
                "planning_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stateless allocator; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Budget after the overallocation multiplier.
    pub fn effective_budget(&self, total: f64) -> f64 {
        total * (1.0 + self.config.overallocation_percent / 100.0)
    }

    /// How many products can each get the daily minimum.
    pub fn max_products(&self, total: f64) -> usize {
        let per_day = self.effective_budget(total) / f64::from(self.config.planning_days);
        let max = (per_day / self.config.min_daily_budget).floor();
        if max.is_finite() && max >= 1.0 {
            max as usize
        } else {
            0
        }
    }

    /// Choose products and split the budget across them.
    ///
    /// Returns an empty list when no product can be funded at the daily
    /// minimum; that is a valid outcome, not an error.
    pub fn allocate(&self, products: &[Product], budget: &Budget) -> Vec<Allocation> {
        let effective = self.effective_budget(budget.amount);
        let n = self.max_products(budget.amount).min(products.len());

        debug!(
            total = budget.amount,
            effective,
            available = products.len(),
            funded = n,
            "allocating budget"
        );

        if n == 0 {
            return Vec::new();
        }

        let mut sorted = products.to_vec();
        sort_by_floor_price(&mut sorted);

        let currency = if budget.currency.is_empty() {
            self.config.currency.clone()
        } else {
            budget.currency.clone()
        };
        let per_product = effective / n as f64;

        sorted
            .into_iter()
            .take(n)
            .map(|product| Allocation {
                price_per_unit: product.floor(),
                product_id: product.id,
                sales_agent_id: product.sales_agent_id,
                budget_amount: per_product,
                currency: currency.clone(),
            })
            .collect()
    }
}
