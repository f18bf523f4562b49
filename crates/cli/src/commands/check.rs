//! Deployment diagnostics.
//!
//! # Usage
//!
//! ```bash
//! ps-cli check
//! ```
//!
//! Loads the configuration, pings the database, makes one cheap
//! authenticated GET against Stripe and Printful, and reports which optional
//! integrations are configured. Exits non-zero if any required check fails.

use printshop_storefront::config::{ConfigError, StorefrontConfig};
use printshop_storefront::db;
use printshop_storefront::services::printful::PrintfulClient;
use printshop_storefront::services::stripe::StripeClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} check(s) failed")]
    Failed(usize),
}

/// Outcome of one diagnostic.
struct Outcome {
    name: &'static str,
    result: Result<String, String>,
}

impl Outcome {
    fn report(&self) {
        match &self.result {
            Ok(detail) => tracing::info!("[ok]   {}: {}", self.name, detail),
            Err(reason) => tracing::error!("[fail] {}: {}", self.name, reason),
        }
    }
}

/// Run every check and report each result.
pub async fn run() -> Result<(), CheckError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("[ok]   configuration: loaded for {}", config.base_url);

    let mut outcomes = Vec::new();

    outcomes.push(Outcome {
        name: "database",
        result: match db::create_pool(&config.database_url).await {
            Ok(pool) => sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(&pool)
                .await
                .map(|_| "reachable".to_string())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
    });

    outcomes.push(Outcome {
        name: "stripe",
        result: StripeClient::new(&config.stripe)
            .check_credentials()
            .await
            .map(|()| "credentials accepted".to_string())
            .map_err(|e| e.to_string()),
    });

    let printful = match PrintfulClient::new(&config.printful) {
        Ok(client) => client
            .check_credentials()
            .await
            .map(|()| format!("credentials accepted for store {}", client.store_id()))
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    outcomes.push(Outcome {
        name: "printful",
        result: printful,
    });

    for outcome in &outcomes {
        outcome.report();
    }

    match &config.email {
        Some(email) => tracing::info!(
            "[ok]   smtp: {}:{} as {}",
            email.smtp_host,
            email.smtp_port,
            email.from_address
        ),
        None => tracing::warn!("[skip] smtp: not configured, transactional email disabled"),
    }
    if config.push.is_some() {
        tracing::info!("[ok]   push: configured");
    } else {
        tracing::warn!("[skip] push: not configured, notifications disabled");
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        return Err(CheckError::Failed(failed));
    }
    tracing::info!("All checks passed!");
    Ok(())
}
