//! Pipeline driver
//!
//! One forward pass: fetch (intersecting filter sets) → normalize and
//! classify every event → count indicators → open the submitter for that
//! count → stream request bodies into it one at a time. The first error
//! aborts the run; the submission scope still flushes what it holds.

use crate::configuration::Configuration;
use crate::errors::Result;
use crate::event_processing::{
    AttributeClassifier, EventFilterIntersector, EventNormalizer, ParsedEvent,
    RequestBodyAssembler,
};
use crate::source::EventSource;
use crate::submission::{IndicatorSubmitter, SubmissionScope};
use chrono::Utc;
use log::info;
use misp_relay_common::RawEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub indicators: usize,
    pub submitted: usize,
}

/// Normalize and classify raw events, stamping `expiration_date_time` on
/// every actionable object.
pub fn parse_events(
    config: &Configuration,
    events: &[RawEvent],
    expiration_date_time: &str,
) -> Result<Vec<ParsedEvent>> {
    let normalizer = EventNormalizer::new(config);
    let classifier = AttributeClassifier::new(config, expiration_date_time.to_string());

    events
        .iter()
        .map(|raw| {
            let mut parsed = normalizer.normalize(raw)?;
            classifier.classify(raw, &mut parsed);
            Ok(parsed)
        })
        .collect()
}

pub fn total_indicators(events: &[ParsedEvent]) -> usize {
    events.iter().map(ParsedEvent::indicator_count).sum()
}

pub fn run<E, S, F>(config: &Configuration, source: &E, open_submitter: F) -> Result<RunSummary>
where
    E: EventSource + ?Sized,
    S: IndicatorSubmitter,
    F: FnOnce(usize) -> Result<S>,
{
    info!("Fetching events from source");
    let events = EventFilterIntersector::new(source).fetch(config.filter_sets())?;

    info!("Parsing {} events", events.len());
    let expiration = config.expiration_date_time(Utc::now());
    let parsed_events = parse_events(config, &events, &expiration)?;
    let event_count = events.len();
    drop(events);

    let indicators = total_indicators(&parsed_events);
    let mut scope = SubmissionScope::acquire(indicators, open_submitter)?;
    for body in RequestBodyAssembler::new(config).assemble(&parsed_events) {
        scope.submit(body?)?;
    }
    let submitted = scope.handled();
    scope.release()?;

    Ok(RunSummary {
        events: event_count,
        indicators,
        submitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_processing::RequestBody;
    use crate::source::JsonFileEventSource;
    use misp_relay_common::RawAttribute;

    #[derive(Default)]
    struct RecordingSubmitter {
        bodies: Vec<RequestBody>,
    }

    impl IndicatorSubmitter for RecordingSubmitter {
        fn handle_indicator(&mut self, body: RequestBody) -> Result<()> {
            self.bodies.push(body);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn raw_event(id: &str) -> RawEvent {
        RawEvent::new(id)
            .with_uuid(&format!("uuid-{}", id))
            .with_timestamp("1614556800")
            .with_publish_timestamp("1614560400")
    }

    #[test]
    fn should_count_indicators_across_events() {
        let config = Configuration::builder().build().unwrap();
        let events = vec![
            raw_event("1")
                .with_attribute(RawAttribute::new("ip-dst", "1.1.1.1").with_timestamp(1))
                .with_attribute(RawAttribute::new("url", "http://a").with_timestamp(1)),
            raw_event("2").with_attribute(RawAttribute::new("comment", "x").with_timestamp(1)),
            raw_event("3").with_attribute(RawAttribute::new("md5", "ff").with_timestamp(1)),
        ];

        let parsed = parse_events(&config, &events, "2030-01-01T00:00:00Z").unwrap();

        assert_eq!(total_indicators(&parsed), 3);
    }

    #[test]
    fn should_size_submitter_by_total_indicators() {
        let config = Configuration::builder().build().unwrap();
        let source = JsonFileEventSource::new(vec![raw_event("1")
            .with_attribute(RawAttribute::new("domain", "a.example").with_timestamp(1))
            .with_attribute(RawAttribute::new("domain", "b.example").with_timestamp(1))]);

        let mut sized_for = None;
        let summary = run(&config, &source, |total| {
            sized_for = Some(total);
            Ok(RecordingSubmitter::default())
        })
        .unwrap();

        assert_eq!(sized_for, Some(2));
        assert_eq!(
            summary,
            RunSummary {
                events: 1,
                indicators: 2,
                submitted: 2
            }
        );
    }

    #[test]
    fn should_abort_before_submission_on_conversion_error() {
        let config = Configuration::builder().build().unwrap();
        let source = JsonFileEventSource::new(vec![
            raw_event("1").with_attribute(RawAttribute::new("url", "http://a").with_timestamp(1)),
            raw_event("2").with_timestamp("not-a-number"),
        ]);

        let mut opened = false;
        let result = run(&config, &source, |_| {
            opened = true;
            Ok(RecordingSubmitter::default())
        });

        assert!(result.is_err());
        assert!(!opened);
    }
}
