//! Price-action betting core — binary entry point.
//!
//! Loads configuration, initialises structured logging, wires the feed,
//! registry, ledger, engine, and scheduler together, and runs the
//! refresh→sweep loop with graceful shutdown. Bet placement comes from
//! the presentation layer through `BetLifecycleEngine::place`.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use priceaction::config::AppConfig;
use priceaction::engine::scheduler::{SchedulerHandle, SettlementScheduler};
use priceaction::engine::BetLifecycleEngine;
use priceaction::feed::coingecko::CoinGeckoSource;
use priceaction::feed::PriceFeed;
use priceaction::ledger::InMemoryLedger;
use priceaction::registry::BetRegistry;
use priceaction::types::BetEvent;

const BANNER: &str = r#"
  ⚡ PRICE ACTION — live price-direction betting core
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        refresh_interval_secs = cfg.feed.refresh_interval_secs,
        request_timeout_secs = cfg.feed.request_timeout_secs,
        history_retention = cfg.betting.history_retention,
        accounts = cfg.accounts.len(),
        "Price-action core starting up"
    );

    // -- Initialise components -------------------------------------------

    let source = Arc::new(CoinGeckoSource::new(Duration::from_secs(
        cfg.feed.request_timeout_secs,
    ))?);
    let feed = Arc::new(PriceFeed::new(source));
    let registry = Arc::new(BetRegistry::new());

    let ledger = Arc::new(InMemoryLedger::new());
    for account in &cfg.accounts {
        ledger.open_account(&account.name, account.balance);
        info!(name = %account.name, balance = %account.balance, "Account seeded");
    }

    let (scheduler_handle, arm_rx) = SchedulerHandle::channel();
    let engine = Arc::new(BetLifecycleEngine::new(
        registry,
        feed.clone(),
        ledger,
        scheduler_handle,
        cfg.betting.history_retention,
    ));
    let scheduler = SettlementScheduler::new(engine.clone());
    let _timers = scheduler.run_timers(arm_rx);

    // Relay lifecycle events upward (stands in for the render callback).
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                BetEvent::Created(bet) => info!(%bet, "Bet created"),
                BetEvent::Settled(bet) => info!(%bet, "Bet settled"),
            }
        }
    });

    // -- Refresh loop ----------------------------------------------------

    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.feed.refresh_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.feed.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match feed.refresh().await {
                    Ok(_) => {
                        scheduler.sweep().await;
                    }
                    Err(e) => {
                        // Stale-but-available: keep serving the previous
                        // snapshots and let the next tick retry.
                        warn!(error = %e, "Price refresh failed");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(bets = engine.registry().len(), "Price-action core shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("priceaction=info"));

    let json_logging = std::env::var("PRICEACTION_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
