//! onedrive-adapter command line entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use onedrive_adapter::config::Config;
use onedrive_adapter::filesystem::ByteReader;
use onedrive_adapter::{Filesystem, OneDriveAdapter};

/// OneDrive through a generic filesystem interface.
#[derive(Parser, Debug)]
#[command(name = "onedrive-adapter")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    onedrive-adapter ~/.config/onedrive.yaml ls docs -r
    onedrive-adapter ~/.config/onedrive.yaml put ./backup.tar backups/backup.tar")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a directory
    Ls {
        /// Directory to list, the root when omitted
        #[arg(default_value = "")]
        dir: String,

        /// Descend into folders
        #[arg(short, long)]
        recursive: bool,
    },
    /// Show metadata
    Stat { path: String },
    /// Download to a file, or stdout
    Get {
        remote: String,
        local: Option<PathBuf>,
    },
    /// Upload a file
    Put { local: PathBuf, remote: String },
    /// Move or rename
    Mv { from: String, to: String },
    /// Copy
    Cp { from: String, to: String },
    /// Delete a file or directory
    Rm { path: String },
    /// Create a directory
    Mkdir { path: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn a sentinel into an error naming the command
fn require<T>(value: Option<T>, what: &str) -> Result<T, Box<dyn std::error::Error>> {
    value.ok_or_else(|| format!("{} failed", what).into())
}

fn check(ok: bool, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if ok {
        Ok(())
    } else {
        Err(format!("{} failed", what).into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Loaded configuration from {:?}", cli.config);

    let adapter = match OneDriveAdapter::from_config(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&adapter, cli.command).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    adapter: &OneDriveAdapter,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Ls { dir, recursive } => {
            print_json(&require(adapter.list_contents(&dir, recursive).await, "ls")?)
        }
        Commands::Stat { path } => print_json(&require(adapter.get_metadata(&path).await, "stat")?),
        Commands::Get { remote, local } => {
            let mut file = require(adapter.read_stream(&remote).await, "get")?;
            let copied = match local {
                Some(local) => {
                    let mut out = tokio::fs::File::create(&local).await?;
                    tokio::io::copy(&mut file.stream, &mut out).await?
                }
                None => tokio::io::copy(&mut file.stream, &mut tokio::io::stdout()).await?,
            };
            info!("Downloaded {:?} ({} bytes)", remote, copied);
            Ok(())
        }
        Commands::Put { local, remote } => {
            let reader: ByteReader = Box::new(tokio::fs::File::open(&local).await?);
            print_json(&require(adapter.write_stream(&remote, reader).await, "put")?)
        }
        Commands::Mv { from, to } => check(adapter.rename(&from, &to).await, "mv"),
        Commands::Cp { from, to } => check(adapter.copy(&from, &to).await, "cp"),
        Commands::Rm { path } => check(adapter.delete(&path).await, "rm"),
        Commands::Mkdir { path } => {
            print_json(&require(adapter.create_dir(&path).await, "mkdir")?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ls_flags() {
        let cli = Cli::try_parse_from(["onedrive-adapter", "c.yaml", "ls", "docs", "-r"]).unwrap();
        match cli.command {
            Commands::Ls { dir, recursive } => {
                assert_eq!(dir, "docs");
                assert!(recursive);
            }
            other => panic!("Expected ls, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["onedrive-adapter", "c.yaml", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::Ls { ref dir, recursive: false } if dir.is_empty()));
    }

    #[test]
    fn test_missing_argument_rejected() {
        assert!(Cli::try_parse_from(["onedrive-adapter", "c.yaml", "mv", "a"]).is_err());
    }
}
