//! Raw event normalization
//!
//! Builds the canonical `ParsedEvent` for a raw MISP event: renamed fields,
//! trimmed tags, tag-derived enrichment, canonical timestamps and the
//! `additionalInformation` blob.

use crate::configuration::Configuration;
use crate::enrichment::TagEnricher;
use crate::errors::{RelayError, Result};
use crate::event_processing::ParsedEvent;
use crate::timestamp;
use misp_relay_common::RawEvent;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Raw MISP field name → canonical field name.
pub const EVENT_MAPPING: &[(&str, &str)] = &[
    ("date", "firstReportedDateTime"),
    ("timestamp", "lastReportedDateTime"),
    ("info", "description"),
    ("uuid", "externalId"),
];

/// Serialized into `additionalInformation`; field order is part of the output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdditionalInformation {
    misp_last_reported_datetime: String,
    misp_timestamp: String,
    misp_publish_timestamp: String,
    misp_attribute_timestamps: Vec<BTreeMap<String, String>>,
}

pub struct EventNormalizer<'a> {
    config: &'a Configuration,
}

impl<'a> EventNormalizer<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    pub fn normalize(&self, raw: &RawEvent) -> Result<ParsedEvent> {
        let mut renamed: Map<String, Value> = EVENT_MAPPING
            .iter()
            .map(|(raw_name, canonical)| {
                (
                    canonical.to_string(),
                    raw.field(raw_name).unwrap_or(Value::Null),
                )
            })
            .collect();

        let mut parsed = ParsedEvent::new(&raw.id);
        parsed.external_id = take_text(&mut renamed, "externalId");
        parsed.first_reported_date_time = take_text(&mut renamed, "firstReportedDateTime");
        parsed.description = take_text(&mut renamed, "description").unwrap_or_default();
        parsed.metadata = self.verbatim_metadata(raw);

        parsed.tags = raw.tag_names();
        TagEnricher::enrich(&mut parsed);

        let last_reported = renamed
            .remove("lastReportedDateTime")
            .unwrap_or(Value::Null);
        self.handle_timestamps(&mut parsed, raw, &last_reported)?;

        Ok(parsed)
    }

    /// Configured metadata fields that the relay does not derive itself
    fn verbatim_metadata(&self, raw: &RawEvent) -> Map<String, Value> {
        let metadata = &self.config.metadata;
        metadata
            .required
            .iter()
            .chain(metadata.optional.iter())
            .filter(|name| !ParsedEvent::is_canonical_field(name))
            .filter_map(|name| raw.field(name).map(|value| (name.clone(), value)))
            .collect()
    }

    fn handle_timestamps(
        &self,
        parsed: &mut ParsedEvent,
        raw: &RawEvent,
        last_reported: &Value,
    ) -> Result<()> {
        let last_reported = timestamp::canonicalize("lastReportedDateTime", last_reported)?;
        parsed.last_reported_date_time = Some(last_reported.clone());

        let event_uuid = raw.uuid.clone().unwrap_or_default();
        let attribute_timestamps = raw
            .attributes
            .iter()
            .map(|attribute| {
                let canonical =
                    timestamp::canonicalize_field("Attribute.timestamp", attribute.timestamp.as_ref())?;
                Ok(BTreeMap::from([(event_uuid.clone(), canonical)]))
            })
            .collect::<Result<Vec<_>>>()?;

        let info = AdditionalInformation {
            misp_last_reported_datetime: last_reported,
            misp_timestamp: timestamp::canonicalize_field("timestamp", raw.timestamp.as_ref())?,
            misp_publish_timestamp: timestamp::canonicalize_field(
                "publish_timestamp",
                raw.publish_timestamp.as_ref(),
            )?,
            misp_attribute_timestamps: attribute_timestamps,
        };

        let blob = serde_json::to_string(&info).map_err(|e| RelayError::Conversion {
            field: "additionalInformation".to_string(),
            value: e.to_string(),
        })?;
        parsed.additional_information = Some(blob);

        Ok(())
    }
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
