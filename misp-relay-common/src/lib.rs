//! Wire types for events fetched from a MISP instance.
//!
//! These mirror the JSON the event source hands over. Only the fields the
//! relay interprets are typed; everything else is kept verbatim in `extra`
//! so that configured metadata fields can be copied through unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTag {
    pub name: String,
}

impl RawTag {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttribute {
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "Tag", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<RawTag>,
}

impl RawAttribute {
    pub fn new(attribute_type: &str, value: &str) -> Self {
        Self {
            attribute_type: attribute_type.to_string(),
            value: value.to_string(),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<Value>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    pub fn with_tag(mut self, name: &str) -> Self {
        self.tags.push(RawTag::new(name));
        self
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.trim().to_string()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(rename = "Tag", default)]
    pub tags: Vec<RawTag>,
    #[serde(rename = "Attribute", default)]
    pub attributes: Vec<RawAttribute>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawEvent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    pub fn with_info(mut self, info: &str) -> Self {
        self.info = Some(info.to_string());
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<Value>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_publish_timestamp(mut self, timestamp: impl Into<Value>) -> Self {
        self.publish_timestamp = Some(timestamp.into());
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_tag(mut self, name: &str) -> Self {
        self.tags.push(RawTag::new(name));
        self
    }

    pub fn with_attribute(mut self, attribute: RawAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// Looks a field up by its raw MISP name. Null values count as absent.
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => Some(Value::String(self.id.clone())),
            "uuid" => self.uuid.clone().map(Value::String),
            "info" => self.info.clone().map(Value::String),
            "date" => self.date.clone().map(Value::String),
            "timestamp" => self.timestamp.clone(),
            "publish_timestamp" => self.publish_timestamp.clone(),
            "published" => self.published.map(Value::Bool),
            _ => self.extra.get(name).cloned(),
        };
        value.filter(|v| !v.is_null())
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.trim().to_string()).collect()
    }

    pub fn has_attribute_type(&self, attribute_type: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.attribute_type == attribute_type)
    }
}

/// The `{"Event": {...}}` envelope MISP wraps search results in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "Event")]
    pub event: RawEvent,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for event id, got {}",
            other
        ))),
    }
}
