//! Bricky CLI - migrations, catalog seeding and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (including the session table)
//! bricky-cli migrate
//!
//! # Load or update the catalog
//! bricky-cli seed catalog catalog.yaml
//!
//! # Debug account verification
//! bricky-cli users verification-link alice
//! bricky-cli users check-link <uidb64> <token>
//!
//! # Moderate reviews
//! bricky-cli reviews pending
//! bricky-cli reviews approve 42
//!
//! # Recompute an order's totals after editing its lines
//! bricky-cli orders recalculate 17
//!
//! # Check the email backend
//! bricky-cli email check --to me@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "bricky-cli")]
#[command(author, version, about = "Bricky CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage customer accounts
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Moderate product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Order maintenance
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Email backend tools
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert categories and products from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// List accounts and their verification state
    List,
    /// Print a fresh verification link for a user
    VerificationLink {
        /// Username
        username: String,
    },
    /// Explain whether a verification link is valid
    CheckLink {
        /// Encoded user id from the link
        uidb64: String,
        /// Token from the link
        token: String,
    },
    /// Email a new verification link
    ResendVerification {
        /// Username
        username: String,
    },
    /// Mark every account as verified
    VerifyAll,
}

#[derive(Subcommand)]
enum ReviewAction {
    /// List reviews waiting for approval
    Pending,
    /// Publish a review
    Approve {
        /// Review ID
        id: i32,
    },
    /// Unpublish a review
    Hide {
        /// Review ID
        id: i32,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Recompute stored totals from the order's elements
    Recalculate {
        /// Order ID
        id: i32,
    },
}

#[derive(Subcommand)]
enum EmailAction {
    /// Verify the configured backend, optionally sending a test message
    Check {
        /// Send a test message to this address
        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await,
        },
        Commands::Users { action } => match action {
            UserAction::List => commands::users::list().await,
            UserAction::VerificationLink { username } => {
                commands::users::verification_link(&username).await
            }
            UserAction::CheckLink { uidb64, token } => {
                commands::users::check_link(&uidb64, &token).await
            }
            UserAction::ResendVerification { username } => {
                commands::users::resend_verification(&username).await
            }
            UserAction::VerifyAll => commands::users::verify_all().await,
        },
        Commands::Reviews { action } => match action {
            ReviewAction::Pending => commands::reviews::pending().await,
            ReviewAction::Approve { id } => commands::reviews::set_approved(id, true).await,
            ReviewAction::Hide { id } => commands::reviews::set_approved(id, false).await,
        },
        Commands::Orders { action } => match action {
            OrderAction::Recalculate { id } => commands::orders::recalculate(id).await,
        },
        Commands::Email { action } => match action {
            EmailAction::Check { to } => commands::email::check(to.as_deref()).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_link() {
        let cli = Cli::try_parse_from(["bricky-cli", "users", "check-link", "abc", "1-def"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Users {
                action: UserAction::CheckLink { .. }
            })
        ));
    }
}
