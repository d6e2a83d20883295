use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "ettu-cmd")]
#[command(about = "Command-line utility for Ettu galaxy buffers")]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a sealed galaxy buffer from a JSON description
    Build {
        /// JSON file holding the galaxy
        #[arg(short, long)]
        input: String,

        /// Output file for the sealed buffer
        #[arg(short, long)]
        output: String,

        /// JSON file with builder and verifier options
        #[arg(long)]
        config: Option<String>,
    },

    /// Inspect a galaxy buffer and display summary information
    Inspect {
        /// Increase verbosity (-v lists systems, -vv also lists facilities)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Sealed galaxy file
        path: String,
    },

    /// Look up a system, or one of its facilities, by key
    Lookup {
        /// Sealed galaxy file
        path: String,

        /// System id
        #[arg(long)]
        system: u32,

        /// Facility id within the system
        #[arg(long)]
        facility: Option<u32>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Build {
            input,
            output,
            config,
        } => commands::build::run(input, output, config),
        Commands::Inspect { verbose, path } => commands::inspect::run(verbose, path),
        Commands::Lookup {
            path,
            system,
            facility,
        } => commands::lookup::run(path, system, facility),
    }
}
