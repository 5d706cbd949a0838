//! Example agents built on the Scope3 client.
//!
//! - [`SimpleMediaAgent`]: proposes a passthrough tactic over all discovered
//!   inventory and funds assigned tactics through the allocation engine.
//! - [`outcome_agent`]: channel-grouped proposals and assignment acceptance.
//! - [`WebhookServer`]: register/dispatch listener for platform events.
//!
//! Each agent is exposed over HTTP by a router in [`routes`].

mod acknowledgement;
pub mod discovery;
mod error;
mod ledger;
pub mod media_agent;
pub mod outcome_agent;
pub mod routes;
pub mod webhook;

pub use acknowledgement::Acknowledgement;
pub use discovery::{Discovery, discover_products};
pub use error::{Error, Result, ValidationError};
pub use ledger::TacticLedger;
pub use media_agent::SimpleMediaAgent;
pub use routes::{media_agent_router, outcome_agent_router, serve};
pub use webhook::{HandlerId, WebhookConfig, WebhookEvent, WebhookServer};
