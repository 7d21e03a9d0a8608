use std::time::Instant;

use log::info;

use crate::app::controller::Collector;
use crate::config::load_config;
use crate::error::Result;
use crate::utils::{current_human_timestamp, elapsed_label};

/// Entry point used by `main`: config from the working directory, one run.
pub async fn run() -> Result<()> {
    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let collector = Collector::new(config);

    info!("collection started at {}", current_human_timestamp());
    let started = Instant::now();

    let summary = collector.run().await?;

    info!(
        "all data saved to {} ({} fetched, {} excluded, {} failed) in {}",
        summary.output.display(),
        summary.report.fetched(),
        summary.report.excluded(),
        summary.report.failed(),
        elapsed_label(started.elapsed())
    );
    Ok(())
}
