//! Per-tooth statistical shape model builder.
//!
//! # Commands
//!
//! - `ssm build --config tooth.toml` - Align, model, validate and write outputs
//! - `ssm check --config tooth.toml` - Validate a configuration and exit
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod config;
mod pipeline;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::PipelineConfig;

/// Statistical shape models from tooth point clouds
#[derive(Parser)]
#[command(name = "ssm")]
#[command(about = "Correspondence-consistent statistical shape models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one tooth
    Build {
        /// TOML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the worker thread count (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Validate a configuration without running anything
    Check {
        /// TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, workers } => {
            let mut config = PipelineConfig::load(&config)?;
            if let Some(workers) = workers {
                config.workers = workers;
            }
            let summary = pipeline::run(&config)?;

            println!(
                "tooth {}: {} training, {} test, {} refine pass(es), converged: {}",
                config.tooth_index,
                summary.training,
                summary.test,
                summary.iterations,
                summary.converged
            );
            println!(
                "{} components explain {:.2}% of the variance",
                summary.components,
                100.0 * summary.explained_variance
            );
            if let Some(report) = &summary.validation {
                println!(
                    "point error      mean {:.4}  max {:.4}  min {:.4}",
                    report.absolute.mean, report.absolute.max, report.absolute.min
                );
                println!(
                    "relative error   mean {:.4}  max {:.4}  min {:.4}",
                    report.relative.mean, report.relative.max, report.relative.min
                );
                for sample in &report.samples {
                    println!(
                        "  {:>6}  |e| = {:.4}  |e|/|x| = {:.4}",
                        sample.tag.to_string(),
                        sample.error_norm,
                        sample.relative_error_norm
                    );
                }
            }
        }
        Commands::Check { config } => {
            let config = PipelineConfig::load(&config)?;
            println!("{config:#?}");
        }
    }

    Ok(())
}
