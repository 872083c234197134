//! litreview: bibliometric literature review from exported citation records.

use anyhow::Result;
use clap::Parser;
use litreview::config::{Cli, Config};
use litreview::pipeline::{Pipeline, PipelineError, StageStatus};
use litreview::refine;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from(cli);
    let service = refine::default_service(config.scopus_api_key.clone());
    let pipeline = Pipeline::new(config, service);

    let report = match pipeline.run() {
        Ok(report) => report,
        Err(PipelineError::NoSources(_)) => std::process::exit(1),
    };

    for (stage, status) in &report.stages {
        match status {
            StageStatus::Completed | StageStatus::Skipped(_) => info!("{:?}: {}", stage, status),
            _ => warn!("{:?}: {}", stage, status),
        }
    }
    info!(
        "{} loaded, {} after exclusion, {} after refinement",
        report.loaded, report.after_exclusion, report.after_refinement
    );
    if let Some(relevant) = report.relevant {
        info!("{} relevant documents", relevant);
    }
    Ok(())
}
