use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use route_dispatch::config::{load_config, ConfigError};
use route_dispatch::routing::GrantedTags;

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect and exercise a route dispatch configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Check {
        config: PathBuf,
    },
    /// List every endpoint pattern
    Routes {
        config: PathBuf,
    },
    /// Resolve a path and print the outcome as JSON
    Resolve {
        config: PathBuf,
        path: String,
        /// Authentication tag to treat as granted (repeatable)
        #[arg(short, long = "grant")]
        grants: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), ConfigError> {
    match command {
        Commands::Check { config } => {
            let dispatcher = load_config(&config)?;
            println!(
                "OK: {} areas, {} methods",
                dispatcher.tree().area_count(),
                dispatcher.tree().method_count()
            );
        }
        Commands::Routes { config } => {
            let dispatcher = load_config(&config)?;
            for endpoint in dispatcher.tree().endpoints() {
                println!("{}", endpoint);
            }
        }
        Commands::Resolve { config, path, grants } => {
            let dispatcher = load_config(&config)?;
            let resolution = dispatcher.resolve(&path, &GrantedTags::new(grants));
            match serde_json::to_string_pretty(&resolution) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error: failed to encode outcome: {}", e),
            }
        }
    }
    Ok(())
}

fn report(error: &ConfigError) {
    match error {
        ConfigError::Validation(errors) => {
            eprintln!("Error: configuration has {} problem(s):", errors.len());
            for e in errors {
                eprintln!("  - {}", e);
            }
        }
        other => eprintln!("Error: {}", other),
    }
}
