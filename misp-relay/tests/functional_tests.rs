//! Functional tests
//!
//! Full runs from a MISP JSON export on disk to a submissions file, the same
//! path the binary takes.


use assert_matches::assert_matches;
use misp_relay::configuration::{Configuration, FilterSet};
use misp_relay::errors::RelayError;
use misp_relay::pipeline::{self, RunSummary};
use misp_relay::source::JsonFileEventSource;
use misp_relay::submission::{list_submitted, BatchFileSubmitter};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use test_helpers::{events, misp_response, RawEventBuilder, RecordingSubmitter};

fn config_writing_to(dir: &TempDir, batch_size: usize) -> Configuration {
    let mut config = Configuration::builder().build().unwrap();
    config.output.submissions_file = dir.path().join("submitted.jsonl");
    config.output.batch_size = batch_size;
    config
}

fn export_file(dir: &TempDir, content: &str) -> JsonFileEventSource {
    let path = dir.path().join("misp.json");
    fs::write(&path, content).unwrap();
    JsonFileEventSource::from_file(&path).unwrap()
}

mod full_run {
    use super::*;

    #[test]
    fn should_submit_every_indicator_from_export() {
        let dir = TempDir::new().unwrap();
        let config = config_writing_to(&dir, 2);
        let source = export_file(
            &dir,
            &misp_response(&[
                events::amber_campaign_with_one_ip(),
                events::no_actionable_attributes(),
                events::mixed_attributes(),
            ]),
        );

        let summary = pipeline::run(&config, &source, |total| {
            BatchFileSubmitter::open(&config, total)
        })
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                events: 3,
                indicators: 4,
                submitted: 4
            }
        );

        let submitted = list_submitted(&config.output.submissions_file).unwrap();
        assert_eq!(submitted.len(), 4);
        assert_eq!(submitted[0]["networkDestinationIPv4"], json!("1.2.3.4"));
        assert_eq!(submitted[0]["tlpLevel"], json!("amber"));
        assert_eq!(submitted[3]["fileHashValue"], json!("e3b0c44298fc1c149afbf4c8996fb924"));

        // batches of two: 4 indicators in 2 lines
        let content = fs::read_to_string(&config.output.submissions_file).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn should_only_submit_events_passing_all_filter_sets() {
        let dir = TempDir::new().unwrap();
        let mut config = config_writing_to(&dir, 100);
        config.source.event_filters = vec![
            FilterSet::new("not-white").with_criterion("tags", json!(["!tlp:white"])),
            FilterSet::new("published").with_criterion("published", json!(true)),
        ];
        let mut published = events::mixed_attributes();
        published.published = Some(true);
        let source = export_file(
            &dir,
            &misp_response(&[events::amber_campaign_with_one_ip(), published]),
        );

        let summary = pipeline::run(&config, &source, |_| Ok(RecordingSubmitter::default()))
            .unwrap();

        assert_eq!(summary.events, 1);
        assert_eq!(summary.submitted, 3);
    }

    #[test]
    fn should_accept_bare_event_list_export() {
        let dir = TempDir::new().unwrap();
        let config = config_writing_to(&dir, 100);
        let raw = RawEventBuilder::new("7")
            .attribute("hostname", "c2.example")
            .build();
        let source = export_file(&dir, &serde_json::to_string(&vec![raw]).unwrap());

        let summary = pipeline::run(&config, &source, |_| Ok(RecordingSubmitter::default()))
            .unwrap();

        assert_eq!(summary.indicators, 1);
    }
}

mod failure_paths {
    use super::*;

    #[test]
    fn should_not_open_submitter_when_parsing_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_writing_to(&dir, 100);
        let source = export_file(
            &dir,
            &misp_response(&[events::mixed_attributes(), events::with_broken_timestamp()]),
        );

        let result = pipeline::run(&config, &source, |total| {
            BatchFileSubmitter::open(&config, total)
        });

        assert_matches!(result, Err(RelayError::Conversion { .. }));
        assert!(list_submitted(&config.output.submissions_file)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn should_flush_submitted_bodies_before_missing_field_abort() {
        let dir = TempDir::new().unwrap();
        let mut config = config_writing_to(&dir, 100);
        config.metadata.required.push("confidence".to_string());
        let complete = RawEventBuilder::new("1")
            .field("confidence", 80)
            .attribute("url", "http://ok.example")
            .build();
        let incomplete = RawEventBuilder::new("2")
            .attribute("url", "http://missing.example")
            .build();
        let source = export_file(&dir, &misp_response(&[complete, incomplete]));

        let result = pipeline::run(&config, &source, |total| {
            BatchFileSubmitter::open(&config, total)
        });

        assert_matches!(result, Err(RelayError::MissingField { .. }));
        let submitted = list_submitted(&config.output.submissions_file).unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0]["url"], json!("http://ok.example"));
        assert_eq!(submitted[0]["confidence"], json!(80));
    }

    #[test]
    fn should_reject_malformed_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misp.json");
        fs::write(&path, "{\"response\": 42}").unwrap();

        let result = JsonFileEventSource::from_file(&path);

        assert_matches!(result, Err(RelayError::EventSource { .. }));
    }
}
