//! FunnelDesk - Campaign Engagement Reconciliation Runner
//!
//! Reconciles outreach funnel metrics for one client and date range and
//! prints the aggregate set as JSON.
//!
//! Usage:
//!   cargo run --bin funneldesk -- --from 2024-02-01 --to 2024-02-29
//!   cargo run --bin funneldesk -- --from 2024-02-01 --to 2024-02-29 --client acme
//!   cargo run --bin funneldesk -- --from 2024-02-01 --to 2024-02-29 --campaign cmp-123

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use dotenv::dotenv;
use std::env;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use funneldesk_backend::{
    models::Config,
    reconcile::engine::{ReconcileEngine, ReconcileScope},
    sources::client::FunnelApiClient,
};

#[derive(Parser, Debug)]
#[command(name = "funneldesk")]
#[command(about = "Reconcile outreach funnel metrics for one client and date range")]
struct Cli {
    /// Client identifier to scope the run to (all clients when omitted)
    #[arg(long)]
    client: Option<String>,

    /// Start of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: NaiveDate,

    /// End of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: NaiveDate,

    /// Emit per-sequence-step metrics for this campaign instead of the
    /// campaign table
    #[arg(long)]
    campaign: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funneldesk_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    let client = FunnelApiClient::new(&config)?;
    let engine = ReconcileEngine::new(client);
    let scope = ReconcileScope {
        client: cli.client,
        date_from: cli.from,
        date_to: cli.to,
    };

    if let Some(campaign_id) = cli.campaign {
        let steps = engine.sequence_metrics(&scope, &campaign_id).await?;
        info!(campaign = %campaign_id, steps = steps.len(), "sequence reconciliation complete");
        println!("{}", serde_json::to_string_pretty(&steps)?);
    } else {
        let aggregates = engine.campaign_metrics(&scope).await?;
        info!(campaigns = aggregates.len(), "campaign reconciliation complete");
        println!("{}", serde_json::to_string_pretty(&aggregates)?);
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    let api_base = env::var("FUNNELDESK_API_BASE").context("FUNNELDESK_API_BASE not set")?;
    let api_key = env::var("FUNNELDESK_API_KEY").ok();
    let request_timeout_secs = env::var("FUNNELDESK_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    Ok(Config {
        api_base,
        api_key,
        request_timeout_secs,
    })
}
