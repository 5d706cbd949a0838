//! Client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconcile::ReconcilePolicy;
use crate::{Error, Result};

pub const PRODUCTION_URL: &str = "https://api.agentic.scope3.com";
pub const STAGING_URL: &str = "https://api.agentic.staging.scope3.com";

/// Tool Protocol path appended to the base URL.
const TOOL_PATH: &str = "/mcp";

/// Deployment selecting the default base URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Staging,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_URL,
            Self::Staging => STAGING_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Staging => write!(f, "staging"),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            other => Err(Error::Config(format!(
                "unknown environment '{other}' (expected production or staging)"
            ))),
        }
    }
}

/// Options recognized when constructing a session.
#[derive(Clone)]
pub struct ClientConfig {
    /// Credential sent as a bearer token.
    pub api_key: String,
    /// Explicit endpoint override; wins over `environment`.
    pub base_url: Option<String>,
    pub environment: Environment,
    /// Transport timeout; the transport default applies when unset.
    pub timeout: Option<Duration>,
    /// Capture a Debug Record for every successful call.
    pub debug: bool,
    /// Handling of text-only responses.
    pub policy: ReconcilePolicy,
}

impl ClientConfig {
    /// Production defaults around `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            environment: Environment::default(),
            timeout: None,
            debug: false,
            policy: ReconcilePolicy::default(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Base URL after applying the override/environment precedence.
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }

    /// Full Tool Protocol endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{TOOL_PATH}", self.resolved_base_url().trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api key is required".to_string()));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &crate::debug::REDACTED)
            .field("base_url", &self.base_url)
            .field("environment", &self.environment)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .field("policy", &self.policy)
            .finish()
    }
}
