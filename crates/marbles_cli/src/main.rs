//! Marbles CLI
//!
//! Command-line driver for the marble registry over a JSON state file.
//!
//! # Commands
//!
//! - `invoke` - Run one registry function in a transaction
//! - `dump` - Print the contents of the state file
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use marbles_core::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Marble registry command-line tools.
#[derive(Parser)]
#[command(name = "marbles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the state file
    #[arg(global = true, short, long)]
    state: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a registry function
    Invoke {
        /// Function name (e.g. create, readGeneral, queryByOwner)
        function: String,

        /// Positional arguments
        args: Vec<String>,

        /// Transient entry as key=json, may be repeated
        #[arg(short, long = "transient", value_parser = commands::invoke::parse_transient)]
        transient: Vec<(String, String)>,

        /// Match owners exactly instead of lower-casing them
        #[arg(long)]
        case_sensitive_owner: bool,
    },

    /// Print the contents of the state file
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Invoke {
            function,
            args,
            transient,
            case_sensitive_owner,
        } => {
            let path = cli.state.ok_or("State file path required for invoke")?;
            let config = Config::default().lowercase_owner_queries(!case_sensitive_owner);
            commands::invoke::run(&path, function, args, transient, config)?;
        }
        Commands::Dump { format } => {
            let path = cli.state.ok_or("State file path required for dump")?;
            commands::dump::run(&path, &format)?;
        }
        Commands::Version => {
            println!("Marbles CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Marbles Core v{}", marbles_core::VERSION);
        }
    }

    Ok(())
}
