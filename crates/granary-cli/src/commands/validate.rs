//! Validate configuration command

use anyhow::{Context, Result};
use granary_core::Config;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    for (label, path) in [
        ("awards feed", config.awards_path()),
        ("users feed", config.users_path()),
    ] {
        if !path.exists() {
            anyhow::bail!("{} not found: {}", label, path.display());
        }
        tracing::info!("✓ {}: {}", label, path.display());
    }

    match config.project.seed {
        Some(seed) => tracing::info!("✓ Fact generator seed: {} (reproducible runs)", seed),
        None => tracing::info!("✓ Fact generator seed: from OS entropy"),
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
