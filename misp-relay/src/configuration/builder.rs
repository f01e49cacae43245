//! Configuration Builder
//!
//! Provides a builder pattern for constructing Configuration instances
//! from multiple sources with proper validation.

use super::{Classification, Configuration, FileConfig, Metadata, Output, Policy, Runtime, Source};
use crate::errors::RelayError;
use crate::Args;
use clap::Parser;
use std::fs;
use std::path::Path;

/// Builder for creating Configuration instances
///
/// Sources are applied in call order, later ones overriding earlier ones:
/// - Defaults
/// - Configuration files (YAML, JSON, TOML)
/// - CLI arguments
#[derive(Debug)]
pub struct ConfigurationBuilder {
    source: Source,
    policy: Policy,
    classification: Classification,
    metadata: Metadata,
    output: Output,
    runtime: Runtime,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            source: Source::default(),
            policy: Policy::default(),
            classification: Classification::default(),
            metadata: Metadata::default(),
            output: Output::default(),
            runtime: Runtime::default(),
        }
    }

    /// Configure from raw CLI arguments (without the program name)
    pub fn from_cli_args(self, args: &[&str]) -> Result<Self, RelayError> {
        let args = Args::try_parse_from(std::iter::once("misp-relay").chain(args.iter().copied()))
            .map_err(|e| RelayError::ConfigError {
                message: format!("Invalid arguments: {}", e),
            })?;
        self.from_args(&args)
    }

    /// Configure from parsed CLI arguments
    pub fn from_args(mut self, args: &Args) -> Result<Self, RelayError> {
        if let Some(events) = &args.events {
            self.source.events_file = Some(events.clone());
        }
        if let Some(output) = &args.output {
            self.output.submissions_file = output.clone();
        }
        if let Some(action) = &args.action {
            self.policy.action = action.parse()?;
        }
        if args.passive_only {
            self.policy.passive_only = true;
        }
        if let Some(target_product) = &args.target_product {
            self.policy.target_product = target_product.clone();
        }
        if let Some(days) = args.days_to_expire {
            self.policy.days_to_expire = days;
        }
        if let Some(batch_size) = args.batch_size {
            self.output.batch_size = batch_size;
        }
        if args.verbose {
            self.output.verbose = true;
        }

        Ok(self)
    }

    /// Configure from a YAML, JSON or TOML configuration file
    pub fn from_config_file<P: AsRef<Path>>(self, path: P) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| RelayError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        // Auto-detect format by extension or content
        let mut builder = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => self.from_json_str(&content)?,
            Some("toml") => self.from_toml_str(&content)?,
            Some("yaml") | Some("yml") => self.from_yaml_str(&content)?,
            _ if content.trim_start().starts_with('{') => self.from_json_str(&content)?,
            _ => self.from_yaml_str(&content)?,
        };

        builder.runtime.config_file = Some(path.to_path_buf());
        Ok(builder)
    }

    pub fn from_yaml_str(self, yaml: &str) -> Result<Self, RelayError> {
        let config: FileConfig =
            serde_yaml::from_str(yaml).map_err(|e| RelayError::ConfigError {
                message: format!("Failed to parse YAML config: {}", e),
            })?;
        Ok(self.merge(config))
    }

    pub fn from_json_str(self, json: &str) -> Result<Self, RelayError> {
        let config: FileConfig =
            serde_json::from_str(json).map_err(|e| RelayError::ConfigError {
                message: format!("Failed to parse JSON config: {}", e),
            })?;
        Ok(self.merge(config))
    }

    pub fn from_toml_str(self, toml_str: &str) -> Result<Self, RelayError> {
        let config: FileConfig = toml::from_str(toml_str).map_err(|e| RelayError::ConfigError {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(self.merge(config))
    }

    fn merge(mut self, config: FileConfig) -> Self {
        self.source = config.source;
        self.policy = config.policy;
        self.classification = config.classification;
        self.metadata = config.metadata;
        self.output = config.output;
        self
    }

    pub fn with_filter_set(mut self, filter: super::FilterSet) -> Self {
        self.source.event_filters.push(filter);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Configuration, RelayError> {
        let config = Configuration::from_parts(
            self.source,
            self.policy,
            self.classification,
            self.metadata,
            self.output,
            self.runtime,
        );

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
