//! Printshop CLI - migrations, role management, catalog sync and diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema and session table)
//! ps-cli migrate
//!
//! # Grant or revoke admin access
//! ps-cli admin promote -e owner@example.com
//! ps-cli admin demote -e owner@example.com
//!
//! # Pull products from Printful
//! ps-cli catalog sync
//! ps-cli catalog sync --dry-run
//!
//! # Check configuration and provider credentials
//! ps-cli check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(author, version, about = "Printshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Catalog maintenance
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Check configuration, database and provider credentials
    Check,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give a user the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the customer role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Sync products, variants and images from Printful
    Sync {
        /// Print what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ps_cli=info,printshop_storefront=info".into()),
        )
        .init();

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
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
            AdminAction::Demote { email } => commands::admin::demote(&email).await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Sync { dry_run } => commands::catalog::sync(dry_run).await?,
        },
        Commands::Check => commands::check::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_promote() {
        let cli = Cli::try_parse_from(["ps-cli", "admin", "promote", "-e", "a@b.co"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Promote { ref email }
            }) if email == "a@b.co"
        ));
    }

    #[test]
    fn test_parse_catalog_sync_dry_run() {
        let cli = Cli::try_parse_from(["ps-cli", "catalog", "sync", "--dry-run"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Catalog {
                action: CatalogAction::Sync { dry_run: true }
            })
        ));
    }
}
