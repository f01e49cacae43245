//! Unified error types for misp-relay
//!
//! Every stage of the pipeline reports failures through `RelayError`.
//! Nothing is retried or suppressed locally; errors surface to the driver,
//! which aborts the run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Cannot convert {field} to an epoch timestamp: {value}")]
    Conversion { field: String, value: String },

    #[error("Required field {field} missing from event {event_id}")]
    MissingField { field: String, event_id: String },

    #[error("Invalid policy action: {action}. Valid actions: {valid_actions:?}")]
    InvalidPolicyAction {
        action: String,
        valid_actions: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Event source error: {message}")]
    EventSource { message: String },

    #[error("Submission error: {message}")]
    Submission { message: String },
}

/// What the ingestion service should do when an indicator is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Unknown,
    Allow,
    Block,
    Alert,
}

impl PolicyAction {
    pub fn all() -> Vec<PolicyAction> {
        vec![Self::Unknown, Self::Allow, Self::Block, Self::Alert]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Unknown => "unknown",
            PolicyAction::Allow => "allow",
            PolicyAction::Block => "block",
            PolicyAction::Alert => "alert",
        }
    }
}

impl std::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PolicyAction {
    type Err = RelayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(PolicyAction::Unknown),
            "allow" => Ok(PolicyAction::Allow),
            "block" => Ok(PolicyAction::Block),
            "alert" => Ok(PolicyAction::Alert),
            _ => Err(RelayError::InvalidPolicyAction {
                action: s.to_string(),
                valid_actions: PolicyAction::all()
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
