//! Budget allocation for media agents.
//!
//! Pure and synchronous: nothing here performs I/O. Agents feed in the
//! discovered inventory and a budget and get back the allocation set to
//! issue media buys against.
//!
//! - [`AllocationEngine`]: equal split of the budget over the cheapest
//!   products that can each receive the daily minimum.
//! - [`generate_proposals`]: channel-grouped proposals for outcome agents.
//! - [`ReallocationPolicy`]: hook invoked on tactic events that may replace
//!   an existing allocation set.

mod engine;
mod error;
mod product;
pub mod proposals;
mod reallocation;

pub use engine::{AllocationConfig, AllocationEngine};
pub use error::{Error, Result};
pub use product::{
    Allocation, Budget, DEFAULT_CURRENCY, Product, Targeting, average_floor_price,
    sort_by_floor_price,
};
pub use proposals::{Proposal, ProposalRequest, generate_proposals};
pub use reallocation::{
    HoldAllocations, RebalanceOnBudgetChange, ReallocationPolicy, TacticAllocation, TacticEvent,
    TacticFeedback,
};
