//! JMD Tiffins CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! jmd-cli migrate
//!
//! # Hash the staff password for ADMIN_PASSWORD_HASH
//! jmd-cli hash-password < password.txt
//!
//! # Mark orders paid whose payments settled but were not acknowledged
//! jmd-cli reconcile-payments
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "jmd-cli")]
#[command(author, version, about = "JMD Tiffins CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print an Argon2 hash of the password read from stdin
    HashPassword,
    /// Apply settled payments to their orders
    ReconcilePayments,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::HashPassword => commands::password::run(),
        Commands::ReconcilePayments => commands::payments::reconcile().await,
    }
}
