//! Run the warehouse load pipeline

use anyhow::{Context, Result};
use granary_core::Config;
use granary_runtime::Pipeline;

/// Run the pipeline once
pub async fn run(config_path: &str, seed: Option<u64>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if seed.is_some() {
        config.project.seed = seed;
    }

    tracing::info!("Project: {}", config.project.name);

    let pipeline = Pipeline::for_config(config);
    let summary = pipeline.run().await.context("Pipeline run failed")?;

    tracing::info!(
        "Run {} complete: dimMovie +{}/~{}, dimUser +{}/~{}, FactWatchs +{}/~{}",
        summary.run_id,
        summary.movie.appended,
        summary.movie.skipped,
        summary.user.appended,
        summary.user.skipped,
        summary.fact.appended,
        summary.fact.skipped,
    );
    Ok(())
}
