use anyhow::Context;
use clap::Parser;
use log::info;
use misp_relay::configuration::Configuration;
use misp_relay::source::JsonFileEventSource;
use misp_relay::submission::{self, BatchFileSubmitter};
use misp_relay::{pipeline, Args};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut builder = Configuration::builder();
    if let Some(path) = &args.config {
        builder = builder.from_config_file(path)?;
    }
    let config = builder.from_args(&args)?.build()?;

    if args.read_indicators {
        let indicators = submission::list_submitted(&config.output.submissions_file)?;
        for indicator in &indicators {
            println!("{}", serde_json::to_string_pretty(indicator)?);
        }
        println!("{} indicators submitted", indicators.len());
        std::process::exit(0);
    }

    let events_file = config
        .source
        .events_file
        .clone()
        .context("No events file configured: pass --events or set source.events_file")?;

    info!("fetching & parsing data from {}", events_file.display());
    let source = JsonFileEventSource::from_file(&events_file)?;

    let summary = pipeline::run(&config, &source, |total| {
        BatchFileSubmitter::open(&config, total)
    })?;

    info!(
        "Processed {} events, submitted {}/{} indicators",
        summary.events, summary.submitted, summary.indicators
    );
    Ok(())
}
