//! Mock price source for integration testing.
//!
//! Quotes are fully controllable from test code, and any fetch can be
//! forced to fail to exercise the stale-but-available feed behaviour.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use priceaction::feed::PriceSource;
use priceaction::types::{Asset, PriceActionError};

pub struct MockPriceSource {
    prices: Mutex<HashMap<Asset, f64>>,
    force_error: Mutex<Option<String>>,
}

impl MockPriceSource {
    /// A source quoting the given BTC and SOL prices.
    pub fn new(btc: f64, sol: f64) -> Arc<Self> {
        Arc::new(Self {
            prices: Mutex::new(HashMap::from([(Asset::Btc, btc), (Asset::Sol, sol)])),
            force_error: Mutex::new(None),
        })
    }

    /// Change the quote for one asset; visible after the next refresh.
    pub fn set_price(&self, asset: Asset, price: f64) {
        self.prices.lock().unwrap().insert(asset, price);
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_prices(
        &self,
        _assets: &[Asset],
    ) -> Result<HashMap<Asset, f64>, PriceActionError> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(PriceActionError::FeedUnavailable {
                source: "mock".to_string(),
                message: err.clone(),
            });
        }
        Ok(self.prices.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
