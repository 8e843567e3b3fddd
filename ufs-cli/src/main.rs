// SPDX-License-Identifier: AGPL-3.0-or-later
//! Unified Storage CLI
//!
//! Thin front end over the storage library, for poking at real directories.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use ufs_core::CollisionPolicy;

#[derive(Parser)]
#[command(name = "ufs")]
#[command(author, version, about = "Unified Storage - collision-aware file operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// What to do when the destination name is taken
#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Fail,
    Replace,
    Unique,
    Open,
}

impl From<Policy> for CollisionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Fail => CollisionPolicy::FailIfExists,
            Policy::Replace => CollisionPolicy::ReplaceExisting,
            Policy::Unique => CollisionPolicy::GenerateUniqueName,
            Policy::Open => CollisionPolicy::OpenIfExists,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the local, roaming and temporary storage roots
    Roots,

    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Directory to list (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Only files matching this mask, e.g. "*.txt"
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Create an empty file
    Touch {
        path: String,

        #[arg(short, long, value_enum, default_value = "open")]
        policy: Policy,
    },

    /// Create a directory
    Mkdir {
        path: String,

        #[arg(short, long, value_enum, default_value = "fail")]
        policy: Policy,
    },

    /// Move a file
    Mv {
        source: String,

        /// Destination file, or an existing directory to move into
        dest: String,

        #[arg(short, long, value_enum, default_value = "fail")]
        policy: Policy,
    },

    /// Rename a file within its directory
    Rename {
        path: String,

        new_name: String,

        #[arg(short, long, value_enum, default_value = "fail")]
        policy: Policy,
    },

    /// Copy a file
    Cp {
        source: String,

        /// Destination file, or an existing directory to copy into
        dest: String,

        #[arg(short, long, value_enum, default_value = "fail")]
        policy: Policy,
    },

    /// Remove a file, or a directory with everything in it
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Report whether a path exists and what it is
    Exists {
        path: String,
    },

    /// Display file contents
    Cat {
        path: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = match commands::Session::open(cli.config.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Roots => session.roots(),
        Commands::Ls { path, pattern } => session.ls(&path, pattern.as_deref()).await,
        Commands::Touch { path, policy } => session.touch(&path, policy.into()).await,
        Commands::Mkdir { path, policy } => session.mkdir(&path, policy.into()).await,
        Commands::Mv { source, dest, policy } => session.mv(&source, &dest, policy.into()).await,
        Commands::Rename { path, new_name, policy } => {
            session.rename(&path, &new_name, policy.into()).await
        }
        Commands::Cp { source, dest, policy } => session.cp(&source, &dest, policy.into()).await,
        Commands::Rm { paths } => session.rm(&paths).await,
        Commands::Exists { path } => session.exists(&path).await,
        Commands::Cat { path } => session.cat(&path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
