//! Settlement scheduling.
//!
//! Every active bet must be evaluated at or after its expiry, even when a
//! timer is delayed or dropped. Two redundant triggers feed the engine's
//! idempotent `settle`: a one-shot timer armed when the bet is placed, and
//! a sweep of all active bets run after every successful price refresh.
//! Whichever trigger arrives first wins; the other observes the bet
//! already terminal and does nothing.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::{Bet, PriceActionError};

use super::BetLifecycleEngine;

/// Request to arm a one-shot settlement timer for a bet.
#[derive(Debug)]
pub struct ArmRequest {
    bet_id: String,
    end_time: DateTime<Utc>,
}

/// Sending half of the scheduler's arming channel, held by the engine.
///
/// If the scheduler task is not running (e.g. in tests driving `settle`
/// directly) arming is a no-op; the sweep still covers the bet.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<ArmRequest>,
}

impl SchedulerHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ArmRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn arm(&self, bet: &Bet) {
        let request = ArmRequest {
            bet_id: bet.id.clone(),
            end_time: bet.end_time,
        };
        if self.tx.send(request).is_err() {
            debug!(bet_id = %bet.id, "Scheduler not running; sweep will settle this bet");
        }
    }
}

pub struct SettlementScheduler {
    engine: Arc<BetLifecycleEngine>,
}

impl SettlementScheduler {
    pub fn new(engine: Arc<BetLifecycleEngine>) -> Self {
        Self { engine }
    }

    /// Spawn the timer task: for each arm request, a one-shot sleeper
    /// fires at the bet's expiry and settles it. Deferred and already-
    /// settled outcomes are left to the sweep.
    pub fn run_timers(&self, mut rx: mpsc::UnboundedReceiver<ArmRequest>) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let wait = (request.end_time - Utc::now()).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;
                    Self::fire(&engine, &request.bet_id, "timer").await;
                });
            }
            debug!("Scheduler arming channel closed");
        })
    }

    /// Evaluate every active bet whose expiry has passed. Run after each
    /// successful feed refresh to catch bets whose timer was delayed,
    /// dropped, or deferred. Returns how many bets were settled.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut settled = 0usize;

        for id in self.engine.registry().active_ids() {
            // Re-read under the registry: the snapshot may be stale.
            let bet = match self.engine.registry().get(&id) {
                Ok(bet) => bet,
                Err(_) => continue,
            };
            if !bet.is_due(now) {
                continue;
            }
            if Self::fire(&self.engine, &id, "sweep").await {
                settled += 1;
            }
        }

        if settled > 0 {
            info!(settled, "Sweep settled due bets");
        }
        settled
    }

    /// Run the shared settlement path for one trigger. Returns whether
    /// this trigger performed the settlement.
    async fn fire(engine: &BetLifecycleEngine, bet_id: &str, trigger: &str) -> bool {
        match engine.settle(bet_id).await {
            Ok(bet) => {
                debug!(%bet_id, trigger, status = %bet.status, "Settlement trigger fired");
                true
            }
            Err(PriceActionError::SettlementDeferred { .. }) => {
                debug!(%bet_id, trigger, "No snapshot yet; retrying on next refresh");
                false
            }
            Err(PriceActionError::InvalidTransition { .. }) => {
                // The other trigger won the race.
                debug!(%bet_id, trigger, "Bet already settled");
                false
            }
            Err(PriceActionError::NotFound(_)) => {
                debug!(%bet_id, trigger, "Bet removed before trigger fired");
                false
            }
            Err(e) => {
                warn!(%bet_id, trigger, error = %e, "Settlement attempt failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
