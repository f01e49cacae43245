//! Configuration type definitions
//!
//! Defines the configuration sections used throughout the relay. Every
//! section deserializes with defaults so a config file only needs to name
//! what it changes.

use crate::errors::PolicyAction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A named set of search criteria passed to the event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilterSet {
    pub name: String,
    #[serde(default)]
    pub criteria: Map<String, Value>,
}

impl FilterSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            criteria: Map::new(),
        }
    }

    pub fn with_criterion(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.criteria.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Source {
    pub events_file: Option<PathBuf>,
    pub event_filters: Vec<FilterSet>,
}

/// Static fields stamped onto every request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub action: PolicyAction,
    pub passive_only: bool,
    pub target_product: String,
    pub days_to_expire: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub actor_name_type: String,
    pub comment_type: String,
    pub actionable_types: Vec<String>,
}

/// Event fields copied onto request bodies, by canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub verbose: bool,
    pub batch_size: usize,
    pub submissions_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Runtime {
    pub config_file: Option<PathBuf>,
}

/// Shape of a config file on disk. Missing sections keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub source: Source,
    pub policy: Policy,
    pub classification: Classification,
    pub metadata: Metadata,
    pub output: Output,
}

pub const THREAT_TYPE: &str = "watchlist";
pub const MAX_BATCH_SIZE: usize = 100;

impl Default for Policy {
    fn default() -> Self {
        Self {
            action: PolicyAction::Alert,
            passive_only: false,
            target_product: "Azure Sentinel".to_string(),
            days_to_expire: 30,
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            actor_name_type: "threat-actor".to_string(),
            comment_type: "comment".to_string(),
            actionable_types: [
                "ip-src",
                "ip-dst",
                "ip-src|port",
                "ip-dst|port",
                "domain",
                "domain|ip",
                "hostname",
                "url",
                "user-agent",
                "email-src",
                "email-dst",
                "email-subject",
                "filename",
                "md5",
                "sha1",
                "sha256",
                "authentihash",
                "filename|md5",
                "filename|sha1",
                "filename|sha256",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            required: vec!["description".to_string(), "tlpLevel".to_string()],
            optional: [
                "activityGroupNames",
                "additionalInformation",
                "confidence",
                "diamondModel",
                "externalId",
                "firstReportedDateTime",
                "isActive",
                "killChain",
                "knownFalsePositives",
                "lastReportedDateTime",
                "malwareFamilyNames",
                "severity",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            verbose: false,
            batch_size: MAX_BATCH_SIZE,
            submissions_file: PathBuf::from("submitted_indicators.jsonl"),
        }
    }
}
