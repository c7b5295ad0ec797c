//! Emporium CLI - operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Grant or revoke the admin claim
//! emporium admin promote --uid 8Jd0...
//! emporium admin demote --uid 8Jd0...
//!
//! # Load products from a YAML file
//! emporium seed --file products.yaml
//! ```
//!
//! Both commands talk to Firebase with `FIREBASE_PROJECT_ID`,
//! `FIREBASE_API_KEY` and `FIREBASE_ADMIN_ACCESS_TOKEN`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use emporium_admin::services::ClaimAction;

mod commands;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the admin claim of a user
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Create products from a YAML list
    Seed {
        /// Path to the YAML file
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Set `admin: true`
    Promote {
        /// Firebase user id
        #[arg(short, long)]
        uid: String,
    },
    /// Set `admin: false`
    Demote {
        /// Firebase user id
        #[arg(short, long)]
        uid: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Admin { action } => {
            let (action, uid) = match action {
                AdminAction::Promote { uid } => (ClaimAction::Promote, uid),
                AdminAction::Demote { uid } => (ClaimAction::Demote, uid),
            };
            let backend = commands::connect()?;
            commands::admin::set_claim(&backend, &uid, action).await?;
        }
        Commands::Seed { file } => {
            let backend = commands::connect()?;
            let created = commands::seed::products_from_file(&backend, &file).await?;
            tracing::info!(created, "Seeding finished");
        }
    }
    Ok(())
}
