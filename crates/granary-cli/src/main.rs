//! Granary CLI
//!
//! Developer tool for scaffolding a warehouse project and running the
//! transform-and-load pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Granary - deduplicating star-schema warehouse loader
#[derive(Parser)]
#[command(name = "granary")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "granary.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Granary project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration without running
    Validate,

    /// Run the warehouse load pipeline
    Run {
        /// Override the fact-generator seed from the configuration
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show project status
    Status {
        /// Emit the status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: human-readable stderr, plus an append-only file
    // sink once a project configuration is in reach. The guard must live
    // until exit so the file flushes on every path.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (file_layer, _guard) = match granary_core::Config::load(&cli.config) {
        Ok(config) => {
            let dir = config.log_dir();
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "granary.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(guard))
        }
        // No configuration yet (e.g. `granary init`): stderr only.
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Run { seed } => {
            commands::run::run(&cli.config, seed).await?;
        }
        Commands::Status { json } => {
            commands::status::run(&cli.config, json).await?;
        }
    }

    Ok(())
}
