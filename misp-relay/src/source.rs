//! Event source seam
//!
//! The pipeline only needs one operation from the platform it pulls events
//! from: a search, optionally narrowed by a set of criteria. Transport,
//! authentication and pagination live behind the `EventSource` trait.
//!
//! `JsonFileEventSource` answers searches from a MISP JSON export on disk.

use crate::errors::{RelayError, Result};
use log::debug;
use misp_relay_common::{EventEnvelope, RawEvent};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub type SearchCriteria = Map<String, Value>;

pub trait EventSource {
    /// Return every event matching `criteria`, or all events when `None`
    fn search(&self, criteria: Option<&SearchCriteria>) -> Result<Vec<RawEvent>>;
}

pub const SUPPORTED_CRITERIA: &[&str] = &[
    "tags",
    "eventid",
    "published",
    "type_attribute",
    "threat_level_id",
];

#[derive(Debug, Clone)]
pub struct JsonFileEventSource {
    events: Vec<RawEvent>,
}

impl JsonFileEventSource {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self { events }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| RelayError::EventSource {
            message: format!("Failed to read events file {}: {}", path.display(), e),
        })?;
        let source = Self::from_json_str(&content)?;
        debug!(
            "Loaded {} events from {}",
            source.events.len(),
            path.display()
        );
        Ok(source)
    }

    /// Accepts `{"response": [...]}`, a list of `{"Event": ...}` envelopes,
    /// a bare list of events, or a single envelope.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json).map_err(|e| RelayError::EventSource {
            message: format!("Failed to parse events JSON: {}", e),
        })?;

        let items = match document {
            Value::Object(mut object) if object.contains_key("response") => {
                match object.remove("response") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(RelayError::EventSource {
                            message: "'response' must be a list of events".to_string(),
                        })
                    }
                }
            }
            Value::Array(items) => items,
            single @ Value::Object(_) => vec![single],
            _ => {
                return Err(RelayError::EventSource {
                    message: "Events JSON must be an object or a list".to_string(),
                })
            }
        };

        let events = items
            .into_iter()
            .map(parse_event)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for JsonFileEventSource {
    fn search(&self, criteria: Option<&SearchCriteria>) -> Result<Vec<RawEvent>> {
        let Some(criteria) = criteria else {
            return Ok(self.events.clone());
        };

        if let Some(unknown) = criteria
            .keys()
            .find(|key| !SUPPORTED_CRITERIA.contains(&key.as_str()))
        {
            return Err(RelayError::EventSource {
                message: format!(
                    "Unsupported search criterion: {}. Supported: {:?}",
                    unknown, SUPPORTED_CRITERIA
                ),
            });
        }

        let mut matched = Vec::new();
        for event in &self.events {
            if matches_all(event, criteria)? {
                matched.push(event.clone());
            }
        }
        Ok(matched)
    }
}

fn parse_event(item: Value) -> Result<RawEvent> {
    let is_envelope = item.get("Event").is_some();
    let parsed = if is_envelope {
        serde_json::from_value::<EventEnvelope>(item).map(|envelope| envelope.event)
    } else {
        serde_json::from_value::<RawEvent>(item)
    };
    parsed.map_err(|e| RelayError::EventSource {
        message: format!("Malformed event: {}", e),
    })
}

fn matches_all(event: &RawEvent, criteria: &SearchCriteria) -> Result<bool> {
    for (key, value) in criteria {
        let matched = match key.as_str() {
            "tags" => matches_tags(event, &text_values(key, value)?),
            "eventid" => text_values(key, value)?.contains(&event.id),
            "published" => {
                let wanted = value.as_bool().ok_or_else(|| invalid_criterion(key, value))?;
                event.published.unwrap_or(false) == wanted
            }
            "type_attribute" => text_values(key, value)?
                .iter()
                .any(|t| event.has_attribute_type(t)),
            "threat_level_id" => {
                let wanted = text_values(key, value)?;
                event
                    .field("threat_level_id")
                    .is_some_and(|level| wanted.contains(&text_of(&level)))
            }
            _ => false,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Any listed tag must be present; `!`-prefixed tags must all be absent
fn matches_tags(event: &RawEvent, wanted: &[String]) -> bool {
    let tags = event.tag_names();
    let (excluded, included): (Vec<&String>, Vec<&String>) =
        wanted.iter().partition(|t| t.starts_with('!'));

    let has_included =
        included.is_empty() || included.iter().any(|t| tags.iter().any(|tag| tag == *t));
    let has_excluded = excluded
        .iter()
        .any(|t| tags.iter().any(|tag| tag.as_str() == &t[1..]));

    has_included && !has_excluded
}

fn text_values(key: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(_) | Value::Number(_) => Ok(vec![text_of(value)]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(_) | Value::Number(_) => Ok(text_of(item)),
                _ => Err(invalid_criterion(key, value)),
            })
            .collect(),
        _ => Err(invalid_criterion(key, value)),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid_criterion(key: &str, value: &Value) -> RelayError {
    RelayError::EventSource {
        message: format!("Invalid value for search criterion {}: {}", key, value),
    }
}
