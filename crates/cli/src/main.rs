//! Bookstore CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bookstore-cli migrate
//!
//! # Create an admin account
//! bookstore-cli user create -u admin -e admin@example.com -p 'S3cure!pass' -r admin
//!
//! # Load catalog entries from YAML
//! bookstore-cli seed books crates/cli/seeds/books.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookstore-cli")]
#[command(author, version, about = "Bookstore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user with any role
    Create {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters, no whitespace)
        #[arg(short, long)]
        password: String,

        /// Role (`customer`, `moderator`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert books from a YAML file
    Books {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&username, &email, &password, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Books { file } => commands::seed::books(&file).await?,
        },
    }
    Ok(())
}
