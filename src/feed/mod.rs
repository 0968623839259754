//! Price feed.
//!
//! Defines the `PriceSource` trait over external price providers and the
//! `PriceFeed` snapshot cache the rest of the core reads from. The feed is
//! refreshed on a fixed cadence independent of bet activity; a failed
//! refresh keeps the previous snapshots so callers see stale-but-available
//! prices instead of nothing.

pub mod coingecko;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::types::{Asset, PriceActionError, PriceSnapshot};

/// Abstraction over external price providers.
///
/// Implementors fetch the current price for a set of assets in one call
/// and fail with `FeedUnavailable` on transport errors or malformed data.
/// Implementations must bound their wait (request timeout) so a dead
/// provider cannot hang the event loop.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch current prices for the given assets.
    async fn fetch_prices(
        &self,
        assets: &[Asset],
    ) -> Result<HashMap<Asset, f64>, PriceActionError>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

/// Latest-known prices per asset, one snapshot each.
///
/// Snapshots are replaced wholesale on every successful refresh and never
/// partially updated; `latest` never blocks on a refresh in flight.
pub struct PriceFeed {
    source: Arc<dyn PriceSource>,
    assets: Vec<Asset>,
    snapshots: RwLock<HashMap<Asset, PriceSnapshot>>,
}

impl PriceFeed {
    /// A feed tracking every known asset.
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self::with_assets(source, Asset::ALL.to_vec())
    }

    pub fn with_assets(source: Arc<dyn PriceSource>, assets: Vec<Asset>) -> Self {
        Self {
            source,
            assets,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch current prices for all tracked assets and replace the stored
    /// snapshots. On failure the previous snapshots are retained and the
    /// error is surfaced so the caller can show a degraded state.
    pub async fn refresh(&self) -> Result<Vec<PriceSnapshot>, PriceActionError> {
        let prices = self.source.fetch_prices(&self.assets).await?;

        let fetched_at = Utc::now();
        let mut fresh = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let price = prices.get(asset).copied().ok_or_else(|| {
                PriceActionError::FeedUnavailable {
                    source: self.source.name().to_string(),
                    message: format!("response missing price for {asset}"),
                }
            })?;
            fresh.push(PriceSnapshot {
                asset: *asset,
                price,
                fetched_at,
            });
        }

        let mut snapshots = self.snapshots.write().expect("price feed lock poisoned");
        for snap in &fresh {
            snapshots.insert(snap.asset, *snap);
        }
        drop(snapshots);

        for snap in &fresh {
            debug!(asset = %snap.asset, price = snap.price, "Price refreshed");
        }
        Ok(fresh)
    }

    /// The most recent successfully fetched snapshot for an asset, or
    /// `None` if no fetch has succeeded yet. Never blocks.
    pub fn latest(&self, asset: Asset) -> Option<PriceSnapshot> {
        self.snapshots
            .read()
            .expect("price feed lock poisoned")
            .get(&asset)
            .copied()
    }

    /// Assets this feed tracks.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
