//! Unified Configuration System
//!
//! Combines defaults, a config file (YAML, JSON or TOML) and command-line
//! arguments into one validated `Configuration` value. The value is built
//! once at startup and passed by reference to every stage that needs it.
//!
//! # Basic Usage
//!
//! ```rust
//! use misp_relay::configuration::Configuration;
//!
//! let config = Configuration::builder()
//!     .from_cli_args(&["--action", "block", "--verbose"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! assert!(config.is_verbose());
//! assert!(config.is_actionable_type("ip-dst"));
//! assert!(!config.is_actionable_type("comment"));
//! ```

pub mod builder;
pub mod types;

pub use builder::ConfigurationBuilder;
pub use types::*;

use crate::errors::RelayError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Validated relay configuration
///
/// Attribute-type membership checks run once per attribute of every event,
/// so the actionable type list is cached as a `HashSet` on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub source: Source,
    pub policy: Policy,
    pub classification: Classification,
    pub metadata: Metadata,
    pub output: Output,
    pub runtime: Runtime,
    #[doc(hidden)]
    cached_actionable_types: OnceLock<HashSet<String>>,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub(crate) fn from_parts(
        source: Source,
        policy: Policy,
        classification: Classification,
        metadata: Metadata,
        output: Output,
        runtime: Runtime,
    ) -> Self {
        Self {
            source,
            policy,
            classification,
            metadata,
            output,
            runtime,
            cached_actionable_types: OnceLock::new(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.output.batch_size == 0 || self.output.batch_size > MAX_BATCH_SIZE {
            return Err(RelayError::ConfigError {
                message: format!("Batch size must be between 1 and {}", MAX_BATCH_SIZE),
            });
        }

        if self.classification.actionable_types.is_empty() {
            return Err(RelayError::ConfigError {
                message: "At least one actionable attribute type must be specified".to_string(),
            });
        }

        if self.policy.target_product.trim().is_empty() {
            return Err(RelayError::ConfigError {
                message: "Target product must not be empty".to_string(),
            });
        }

        if self.policy.days_to_expire <= 0 {
            return Err(RelayError::ConfigError {
                message: "days_to_expire must be positive".to_string(),
            });
        }

        let mut names = HashSet::new();
        for filter in &self.source.event_filters {
            if !names.insert(filter.name.as_str()) {
                return Err(RelayError::ConfigError {
                    message: format!("Duplicate event filter name: {}", filter.name),
                });
            }
        }

        Ok(())
    }

    pub fn is_verbose(&self) -> bool {
        self.output.verbose
    }

    pub fn filter_sets(&self) -> &[FilterSet] {
        &self.source.event_filters
    }

    pub fn is_actor_name_type(&self, attribute_type: &str) -> bool {
        self.classification.actor_name_type == attribute_type
    }

    pub fn is_comment_type(&self, attribute_type: &str) -> bool {
        self.classification.comment_type == attribute_type
    }

    /// Check whether an attribute type becomes a submittable indicator
    pub fn is_actionable_type(&self, attribute_type: &str) -> bool {
        let cache = self.cached_actionable_types.get_or_init(|| {
            self.classification
                .actionable_types
                .iter()
                .cloned()
                .collect()
        });
        cache.contains(attribute_type)
    }

    /// Expiration instant for indicators created by a run starting at `now`
    pub fn expiration_date_time(&self, now: DateTime<Utc>) -> String {
        (now + Duration::days(self.policy.days_to_expire))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }
}
