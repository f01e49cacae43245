//! Request body assembly
//!
//! Fans parsed events out into one request body per actionable object. The
//! bodies are produced lazily by a single-pass iterator: event metadata is
//! built when the iterator reaches an event, then merged with each of that
//! event's objects in turn.

use crate::configuration::{Configuration, THREAT_TYPE};
use crate::errors::{RelayError, Result};
use crate::event_processing::{ParsedEvent, RequestBody};
use crate::indicator::ActionableObject;
use serde_json::{Map, Value};
use std::iter::FusedIterator;
use std::slice;

pub struct RequestBodyAssembler<'a> {
    config: &'a Configuration,
}

impl<'a> RequestBodyAssembler<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    pub fn assemble<'e>(&self, events: &'e [ParsedEvent]) -> RequestBodies<'a, 'e> {
        RequestBodies {
            config: self.config,
            events: events.iter(),
            current: None,
        }
    }

    /// Event-level fields shared by every request body of `event`
    pub fn event_metadata(&self, event: &ParsedEvent) -> Result<Map<String, Value>> {
        let mut metadata = Map::new();

        for field in &self.config.metadata.required {
            let value = event
                .field(field)
                .ok_or_else(|| RelayError::MissingField {
                    field: field.clone(),
                    event_id: event.id.clone(),
                })?;
            metadata.insert(field.clone(), value);
        }
        for field in &self.config.metadata.optional {
            if let Some(value) = event.field(field) {
                metadata.insert(field.clone(), value);
            }
        }

        let policy = &self.config.policy;
        metadata.insert(
            "action".to_string(),
            Value::String(policy.action.as_str().to_string()),
        );
        metadata.insert("passiveOnly".to_string(), Value::Bool(policy.passive_only));
        metadata.insert(
            "threatType".to_string(),
            Value::String(THREAT_TYPE.to_string()),
        );
        metadata.insert(
            "targetProduct".to_string(),
            Value::String(policy.target_product.clone()),
        );

        Ok(metadata)
    }
}

struct CurrentEvent<'e> {
    event: &'e ParsedEvent,
    metadata: Map<String, Value>,
    objects: slice::Iter<'e, ActionableObject>,
}

/// Lazy, single-pass sequence of request bodies.
///
/// Yields an error in place of an event's bodies when that event lacks a
/// required metadata field. Once exhausted it stays exhausted.
pub struct RequestBodies<'a, 'e> {
    config: &'a Configuration,
    events: slice::Iter<'e, ParsedEvent>,
    current: Option<CurrentEvent<'e>>,
}

impl<'a, 'e> RequestBodies<'a, 'e> {
    fn merge(event: &ParsedEvent, metadata: &Map<String, Value>, object: &ActionableObject) -> RequestBody {
        let mut body = metadata.clone();
        body.extend(object.fields.clone());

        // event tags first, then the object's own; duplicates are kept
        let tags = event
            .tags
            .iter()
            .chain(object.tags.iter())
            .cloned()
            .map(Value::String)
            .collect();
        body.insert("tags".to_string(), Value::Array(tags));

        RequestBody::new(body)
    }
}

impl<'a, 'e> Iterator for RequestBodies<'a, 'e> {
    type Item = Result<RequestBody>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = &mut self.current {
                if let Some(object) = current.objects.next() {
                    return Some(Ok(Self::merge(current.event, &current.metadata, object)));
                }
                self.current = None;
            }

            let event = self.events.next()?;
            if event.request_objects.is_empty() {
                continue;
            }

            match RequestBodyAssembler::new(self.config).event_metadata(event) {
                Ok(metadata) => {
                    self.current = Some(CurrentEvent {
                        event,
                        metadata,
                        objects: event.request_objects.iter(),
                    })
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl FusedIterator for RequestBodies<'_, '_> {}
