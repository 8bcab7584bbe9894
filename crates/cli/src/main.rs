//! rigstore CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rig-cli migrate
//!
//! # Promote an existing account to admin
//! rig-cli admin promote -e ada@example.com
//!
//! # Create an admin account directly
//! rig-cli admin create -e ops@example.com -n "Ops" -p 'correct horse battery'
//!
//! # Load products from a YAML catalog
//! rig-cli seed -f catalog.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `RIGSTORE_DATABASE_URL` - `PostgreSQL` connection string. Falls back to
//!   `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rig-cli")]
#[command(author, version, about = "rigstore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert products from a YAML catalog file
    Seed {
        /// Path to the catalog file
        #[arg(short, long)]
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },
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

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Seed { file } => {
            commands::seed::catalog(&file).await?;
        }
    }
    Ok(())
}
