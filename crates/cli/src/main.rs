//! Clothify CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! clothify-cli migrate
//!
//! # Grant or revoke the admin role
//! clothify-cli admin grant -e owner@example.com
//! clothify-cli admin revoke -e owner@example.com
//!
//! # Manage promo codes
//! clothify-cli promo create -c DISCOUNT30 -p 30
//! clothify-cli promo deactivate -c DISCOUNT30
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use clothify_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "clothify-cli")]
#[command(author, version, about = "Clothify CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the admin role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the admin role
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an account to the user role
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Create or reactivate a promo code
    Create {
        /// Code shoppers type at checkout (case-insensitive)
        #[arg(short, long)]
        code: String,

        /// Discount percentage (0-100)
        #[arg(short, long)]
        percent: i64,
    },
    /// Deactivate a promo code
    Deactivate {
        #[arg(short, long)]
        code: String,
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => {
                commands::admin::set_role(&email, UserRole::Admin).await?;
            }
            AdminAction::Revoke { email } => {
                commands::admin::set_role(&email, UserRole::User).await?;
            }
        },
        Commands::Promo { action } => match action {
            PromoAction::Create { code, percent } => {
                commands::promo::create(&code, percent).await?;
            }
            PromoAction::Deactivate { code } => commands::promo::deactivate(&code).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_promo_create() {
        let cli = Cli::try_parse_from(["clothify-cli", "promo", "create", "-c", "save5", "-p", "5"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Promo { action: PromoAction::Create { ref code, percent: 5 } } if code == "save5"
        ));
    }

    #[test]
    fn test_parse_admin_grant_requires_email() {
        assert!(Cli::try_parse_from(["clothify-cli", "admin", "grant"]).is_err());
    }
}
