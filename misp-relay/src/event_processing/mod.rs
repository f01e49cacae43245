//! Event Processing Module
//!
//! Turns raw MISP events into request bodies for the indicator ingestion
//! service. Each stage is a pure or event-local transformation:
//!
//! - filter: intersects the events matched by every configured filter set
//! - normalizer: builds a `ParsedEvent` from a `RawEvent`
//! - classifier: routes each raw attribute into the parsed event
//! - assembler: lazily fans parsed events out into `RequestBody` records

pub mod assembler;
pub mod classifier;
pub mod filter;
pub mod normalizer;

pub use assembler::{RequestBodies, RequestBodyAssembler};
pub use classifier::AttributeClassifier;
pub use filter::EventFilterIntersector;
pub use normalizer::EventNormalizer;

use crate::enrichment::DEFAULT_TLP_LEVEL;
use crate::indicator::ActionableObject;
use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical form of one MISP event.
///
/// Fields the relay derives itself are typed; any other configured metadata
/// field is carried verbatim in `metadata` under its raw name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub id: String,
    pub external_id: Option<String>,
    pub first_reported_date_time: Option<String>,
    pub last_reported_date_time: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub activity_group_names: Vec<String>,
    pub tlp_level: String,
    pub diamond_model: Option<String>,
    pub additional_information: Option<String>,
    pub request_objects: Vec<ActionableObject>,
    pub metadata: Map<String, Value>,
}

impl ParsedEvent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            external_id: None,
            first_reported_date_time: None,
            last_reported_date_time: None,
            description: String::new(),
            tags: Vec::new(),
            activity_group_names: Vec::new(),
            tlp_level: DEFAULT_TLP_LEVEL.to_string(),
            diamond_model: None,
            additional_information: None,
            request_objects: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Looks a field up by its canonical (request body) name.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "externalId" => self.external_id.clone().map(Value::String),
            "firstReportedDateTime" => self.first_reported_date_time.clone().map(Value::String),
            "lastReportedDateTime" => self.last_reported_date_time.clone().map(Value::String),
            "description" => Some(Value::String(self.description.clone())),
            "tags" => Some(string_list(&self.tags)),
            "activityGroupNames" => Some(string_list(&self.activity_group_names)),
            "tlpLevel" => Some(Value::String(self.tlp_level.clone())),
            "diamondModel" => self.diamond_model.clone().map(Value::String),
            "additionalInformation" => self.additional_information.clone().map(Value::String),
            _ => self.metadata.get(name).filter(|v| !v.is_null()).cloned(),
        }
    }

    pub fn is_canonical_field(name: &str) -> bool {
        matches!(
            name,
            "externalId"
                | "firstReportedDateTime"
                | "lastReportedDateTime"
                | "description"
                | "tags"
                | "activityGroupNames"
                | "tlpLevel"
                | "diamondModel"
                | "additionalInformation"
        )
    }

    pub fn indicator_count(&self) -> usize {
        self.request_objects.len()
    }
}

/// One flattened submission record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestBody(Map<String, Value>);

impl RequestBody {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.0
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

fn string_list(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_start_with_empty_accumulators_and_red_tlp() {
        let event = ParsedEvent::new("1");

        assert_eq!(event.description, "");
        assert!(event.activity_group_names.is_empty());
        assert!(event.request_objects.is_empty());
        assert_eq!(event.tlp_level, "red");
        assert_eq!(event.diamond_model, None);
    }

    #[test]
    fn should_expose_typed_and_verbatim_fields_by_canonical_name() {
        let mut event = ParsedEvent::new("1");
        event.tags = vec!["tlp:amber".to_string()];
        event.metadata.insert("confidence".to_string(), json!(75));
        event.metadata.insert("severity".to_string(), Value::Null);

        assert_eq!(event.field("tags"), Some(json!(["tlp:amber"])));
        assert_eq!(event.field("tlpLevel"), Some(json!("red")));
        assert_eq!(event.field("confidence"), Some(json!(75)));
        assert_eq!(event.field("severity"), None);
        assert_eq!(event.field("diamondModel"), None);
    }

    #[test]
    fn should_read_request_body_tags() {
        let mut fields = Map::new();
        fields.insert("tags".to_string(), json!(["a", "b", "a"]));
        let body = RequestBody::new(fields);

        assert_eq!(body.tags(), vec!["a", "b", "a"]);
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"tags": ["a", "b", "a"]}));
    }
}
