//! CoinGecko price source.
//!
//! Fetches USD spot prices via the public `/simple/price` endpoint.
//! No API key required. No fallback values: a missing or non-finite price
//! in the response is malformed data and the whole fetch fails, leaving
//! the feed to serve its previous snapshot.
//!
//! API docs: https://docs.coingecko.com/reference/simple-price

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::PriceSource;
use crate::types::{Asset, PriceActionError};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const SOURCE_NAME: &str = "coingecko";

/// Per-coin entry in the `/simple/price` response:
/// `{ "bitcoin": { "usd": 97123.0 }, ... }`
#[derive(Debug, Deserialize)]
struct QuotedPrice {
    usd: f64,
}

pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    /// Build a source with a bounded request timeout so a stalled
    /// provider surfaces as `FeedUnavailable` instead of hanging.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build CoinGecko HTTP client")?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the source at a different base URL (test servers).
    pub fn with_base_url(timeout: Duration, base_url: &str) -> Result<Self> {
        let mut source = Self::new(timeout)?;
        source.base_url = base_url.trim_end_matches('/').to_string();
        Ok(source)
    }

    fn unavailable(message: String) -> PriceActionError {
        PriceActionError::FeedUnavailable {
            source: SOURCE_NAME.to_string(),
            message,
        }
    }

    /// Validate and reshape a decoded response into per-asset prices.
    fn extract_prices(
        body: &HashMap<String, QuotedPrice>,
        assets: &[Asset],
    ) -> Result<HashMap<Asset, f64>, PriceActionError> {
        let mut prices = HashMap::with_capacity(assets.len());
        for asset in assets {
            let quoted = body
                .get(asset.source_id())
                .ok_or_else(|| Self::unavailable(format!("no quote for {}", asset.source_id())))?;
            if !quoted.usd.is_finite() || quoted.usd <= 0.0 {
                return Err(Self::unavailable(format!(
                    "invalid {} price: {}",
                    asset.source_id(),
                    quoted.usd
                )));
            }
            prices.insert(*asset, quoted.usd);
        }
        Ok(prices)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch_prices(
        &self,
        assets: &[Asset],
    ) -> Result<HashMap<Asset, f64>, PriceActionError> {
        let ids = assets
            .iter()
            .map(|a| a.source_id())
            .collect::<Vec<_>>()
            .join(",");

        let url = format!("{}/simple/price", self.base_url);
        debug!(%url, %ids, "Fetching prices");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }

        let body: HashMap<String, QuotedPrice> = response
            .json()
            .await
            .map_err(|e| Self::unavailable(format!("malformed response: {e}")))?;

        Self::extract_prices(&body, assets)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
