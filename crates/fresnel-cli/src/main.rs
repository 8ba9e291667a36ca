//! Fresnel command-line interface.
//!
//! Run propagation jobs from TOML configuration files:
//! ```sh
//! fresnel-cli run job.toml
//! fresnel-cli validate job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fresnel-cli")]
#[command(about = "Fresnel: angular spectrum wavefront propagation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a propagation job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and build its propagator without running it.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Fresnel Angular Spectrum Propagator");
            println!("===================================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_propagation(&job)?;

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            // CSV intensity (default on)
            if job.output.save_intensity {
                let csv_path = out_dir.join("intensity.csv");
                runner::write_intensity_csv(&result.output, &csv_path, &result.summary)?;
            }

            // JSON summary (optional)
            if job.output.save_json {
                let json_path = out_dir.join("summary.json");
                runner::write_summary_json(&result.summary, &json_path)?;
            }

            println!("Propagation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let propagator = runner::build_propagator(&job)?;
            println!(
                "Configuration is valid: {} ({} regime)",
                config.display(),
                propagator.regime()
            );
            Ok(())
        }
    }
}
