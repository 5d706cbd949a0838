//! Scope3 agentic client: Tool Protocol session and response handling.
//!
//! # Overview
//!
//! - **Session**: owns one lazily-opened connection and serializes every
//!   tool invocation through it.
//! - **Reconciler**: turns a raw call result (structured payload, text,
//!   both, or neither) into one value or a diagnosable error.
//! - **Debug capture**: optional per-session record of the last call, with
//!   credentials redacted.
//!
//! # Example
//!
//! ```no_run
//! use client::{ClientConfig, Environment, Session};
//! use serde_json::{Value, json};
//!
//! # async fn example() -> client::Result<()> {
//! let config = ClientConfig::new("api-key")
//!     .environment(Environment::Staging)
//!     .debug(true);
//! let session = Session::new(&config)?;
//!
//! let campaign: Value = session
//!     .campaigns()
//!     .get(json!({ "campaignId": "123" }))
//!     .await?;
//! println!("{campaign}");
//!
//! if let Some(record) = session.last_debug_record().await {
//!     println!("{} took {}ms", record.tool_name, record.duration_ms);
//! }
//!
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub mod debug;
mod error;
pub mod reconcile;
mod resources;
mod session;

pub use config::{ClientConfig, Environment, PRODUCTION_URL, STAGING_URL};
pub use debug::{DebugRecord, REDACTED, sanitize};
pub use error::{Error, Result};
pub use reconcile::{CallOutcome, MESSAGE_FIELD, ReconcilePolicy};
pub use resources::{
    AgentType, Agents, BrandAgents, Campaigns, DataList, MediaBuys, Products, Tactics,
};
pub use session::Session;
