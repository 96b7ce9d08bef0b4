//! Show project status command

use anyhow::{Context, Result};
use granary_core::Config;

/// Run the status command
pub async fn run(config_path: &str, json: bool) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let awards = config.awards_path();
    let users = config.users_path();

    if json {
        let status = serde_json::json!({
            "name": config.project.name,
            "version": config.project.version,
            "files": {
                "awards": { "path": awards, "exists": awards.exists() },
                "users": { "path": users, "exists": users.exists() },
            },
            "tables": ["dimMovie", "dimUser", "FactWatchs"],
            "seed": config.project.seed,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Project:  {} v{}", config.project.name, config.project.version);
    println!("Tables:   dimMovie, dimUser, FactWatchs");
    for (label, path) in [("Awards", &awards), ("Users", &users)] {
        let marker = if path.exists() { "ok" } else { "missing" };
        println!("{label}:   {} ({marker})", path.display());
    }
    match config.project.seed {
        Some(seed) => println!("Seed:     {seed}"),
        None => println!("Seed:     OS entropy"),
    }
    Ok(())
}
