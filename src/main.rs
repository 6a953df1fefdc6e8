//! render-pipeline (v0.1)
//!
//! Serves a directory of page sources through the render pipeline, or
//! writes its prerendered pages to disk.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    RENDER PIPELINE                    │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│   App    │──▶│ routing (table   │   │
//!                      │  │ server  │   │ resolve  │   │  generation)     │   │
//!                      │  └─────────┘   └────┬─────┘   └──────────────────┘   │
//!                      │                     ▼                                 │
//!                      │  ┌──────────────────────────┐   ┌────────────────┐   │
//!                      │  │ loader (compile / cache) │◀──│ dev watcher    │   │
//!                      │  └────────────┬─────────────┘   └────────────────┘   │
//!                      │               ▼                                       │
//!   Client Response    │  ┌──────────────────────────┐   ┌────────────────┐   │
//!   ◀──────────────────┼──│ middleware → page render │──▶│ head assembly  │   │
//!                      │  └──────────────────────────┘   └────────────────┘   │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use render_pipeline::config::load_config;
use render_pipeline::lifecycle::{run_build, run_dev, run_serve, startup::init_observability};

#[derive(Parser)]
#[command(name = "render-pipeline")]
#[command(about = "Render file-routed pages on demand or ahead of time", long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "pipeline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve pages, compiling on demand and watching for changes
    Dev,
    /// Precompile every page, then serve
    Serve,
    /// Write every prerendered page to a directory
    Build {
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Arc::new(load_config(&cli.config)?);
    init_observability(&config);

    tracing::info!(
        config = %cli.config.display(),
        pages = %config.pages.dir.display(),
        base = %config.site.base,
        "render-pipeline v0.1.0 starting"
    );

    match cli.command {
        Commands::Dev => run_dev(config).await?,
        Commands::Serve => run_serve(config).await?,
        Commands::Build { out } => {
            let pages = run_build(config, &out).await?;
            println!("Wrote {} pages to {}", pages.len(), out.display());
        }
    }

    Ok(())
}
