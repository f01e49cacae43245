use clap::Parser;
use std::path::PathBuf;

pub mod configuration;
pub mod enrichment;
pub mod errors;
pub mod event_processing;
pub mod indicator;
pub mod pipeline;
pub mod source;
pub mod submission;
pub mod timestamp;

pub use errors::{PolicyAction, RelayError, Result};
pub use event_processing::{ParsedEvent, RequestBody};
pub use indicator::ActionableObject;
pub use pipeline::RunSummary;

#[derive(Debug, Clone, Parser)]
#[clap(
    name = "misp-relay",
    about = "Relay MISP events to a threat indicator ingestion service"
)]
pub struct Args {
    #[clap(long, help = "Configuration file path (YAML, JSON or TOML)")]
    pub config: Option<PathBuf>,

    #[clap(short, long, help = "MISP JSON export to read events from")]
    pub events: Option<PathBuf>,

    #[clap(short, long, help = "File submitted indicator batches are appended to")]
    pub output: Option<PathBuf>,

    #[clap(long, help = "Action for matching observables: unknown, allow, block, alert")]
    pub action: Option<String>,

    #[clap(long, help = "Mark indicators as passive (no alerts raised)")]
    pub passive_only: bool,

    #[clap(long, help = "Product the indicators are targeted at")]
    pub target_product: Option<String>,

    #[clap(long, help = "Days until submitted indicators expire")]
    pub days_to_expire: Option<i64>,

    #[clap(long, help = "Indicators per submission batch (1-100)")]
    pub batch_size: Option<usize>,

    #[clap(short, long, help = "Show verbose output")]
    pub verbose: bool,

    #[clap(
        short = 'r',
        long,
        help = "List previously submitted indicators and exit"
    )]
    pub read_indicators: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod args_parsing {
        use super::*;

        #[test]
        fn should_parse_short_flags() {
            let args = Args::try_parse_from(["misp-relay", "-v", "-r", "-e", "dump.json"]).unwrap();

            assert!(args.verbose);
            assert!(args.read_indicators);
            assert_eq!(args.events, Some(PathBuf::from("dump.json")));
        }

        #[test]
        fn should_default_to_pipeline_mode() {
            let args = Args::try_parse_from(["misp-relay"]).unwrap();

            assert!(!args.read_indicators);
            assert!(!args.verbose);
            assert_eq!(args.config, None);
        }

        #[test]
        fn should_reject_non_numeric_batch_size() {
            assert!(Args::try_parse_from(["misp-relay", "--batch-size", "lots"]).is_err());
        }
    }
}
