//! Tag-derived enrichment
//!
//! MISP encodes some structured fields as `key:value` tags. Two are lifted
//! onto the parsed event:
//!
//! - `diamondModel`: the first tag containing `diamond-model:` wins
//! - `tlpLevel`: every tag containing `tlp:` overwrites the previous one, so
//!   the last match wins; without one the level is `red`
//!
//! In both cases the value is the text between the first and second colon.

use crate::event_processing::ParsedEvent;

pub const DEFAULT_TLP_LEVEL: &str = "red";

const DIAMOND_MODEL_MARKER: &str = "diamond-model:";
const TLP_MARKER: &str = "tlp:";

pub struct TagEnricher;

impl TagEnricher {
    /// Derive `diamondModel` and `tlpLevel` from the event's tag list
    pub fn enrich(event: &mut ParsedEvent) {
        event.diamond_model = Self::diamond_model(&event.tags);
        event.tlp_level = Self::tlp_level(&event.tags);
    }

    pub fn diamond_model(tags: &[String]) -> Option<String> {
        tags.iter()
            .find(|tag| tag.contains(DIAMOND_MODEL_MARKER))
            .map(|tag| second_component(tag))
    }

    pub fn tlp_level(tags: &[String]) -> String {
        tags.iter()
            .rfind(|tag| tag.contains(TLP_MARKER))
            .map(|tag| second_component(tag))
            .unwrap_or_else(|| DEFAULT_TLP_LEVEL.to_string())
    }
}

fn second_component(tag: &str) -> String {
    tag.split(':').nth(1).unwrap_or_default().to_string()
}
