//! Core engine — the bet lifecycle (validate → place → settle).
//!
//! `BetLifecycleEngine` owns the state machine `ACTIVE -> {WON, LOST}`.
//! Creation validates the request against the ledger balance, snapshots a
//! start price, debits the stake, and registers the bet; settlement reads
//! a fresh snapshot, decides the outcome, and submits the result to the
//! ledger. Both the per-bet timer and the refresh sweep funnel into the
//! same idempotent `settle` operation.

pub mod scheduler;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::feed::PriceFeed;
use crate::ledger::Ledger;
use crate::registry::BetRegistry;
use crate::types::{Asset, Bet, BetEvent, BetStatus, BetWindow, Direction, PriceActionError};

use scheduler::SchedulerHandle;

/// Winning bets pay back twice the stake (1x return + 1x profit).
fn payout_for(amount: Decimal) -> Decimal {
    amount * dec!(2)
}

/// Decide a bet's terminal status from its direction and prices.
///
/// Strict inequality: an end price exactly equal to the start counts as
/// not increased, so a tie resolves as if the price went down.
fn outcome(direction: Direction, start_price: f64, end_price: f64) -> BetStatus {
    let increased = end_price > start_price;
    let won = match direction {
        Direction::Higher => increased,
        Direction::Lower => !increased,
    };
    if won {
        BetStatus::Won
    } else {
        BetStatus::Lost
    }
}

pub struct BetLifecycleEngine {
    registry: Arc<BetRegistry>,
    feed: Arc<PriceFeed>,
    ledger: Arc<dyn Ledger>,
    scheduler: SchedulerHandle,
    events: broadcast::Sender<BetEvent>,
    /// How many settled bets the registry keeps for the history view.
    history_retention: usize,
}

impl BetLifecycleEngine {
    pub fn new(
        registry: Arc<BetRegistry>,
        feed: Arc<PriceFeed>,
        ledger: Arc<dyn Ledger>,
        scheduler: SchedulerHandle,
        history_retention: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            registry,
            feed,
            ledger,
            scheduler,
            events,
            history_retention,
        }
    }

    /// Subscribe to bet lifecycle events (for the presentation layer).
    pub fn subscribe(&self) -> broadcast::Receiver<BetEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<BetRegistry> {
        &self.registry
    }

    /// Place a new bet.
    ///
    /// The balance read is a point-in-time check, not a reservation; a
    /// race with a concurrent debit from the same account surfaces as a
    /// failed debit here or at settlement. Any failure aborts the bet
    /// with nothing persisted.
    pub async fn place(
        &self,
        account: &str,
        asset: Asset,
        direction: Direction,
        amount: Decimal,
        window: BetWindow,
    ) -> Result<Bet, PriceActionError> {
        if amount <= Decimal::ZERO {
            return Err(PriceActionError::InvalidAmount { amount });
        }

        let available = self.ledger.balance(account).await?;
        if amount > available {
            return Err(PriceActionError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        // A bet cannot be created without a starting reference price.
        let snapshot = self
            .feed
            .latest(asset)
            .ok_or(PriceActionError::PriceUnavailable { asset })?;

        let bet = Bet::new(account, asset, direction, amount, snapshot.price, window);

        self.ledger.debit(account, amount).await?;
        self.registry.insert(bet.clone())?;
        self.scheduler.arm(&bet);

        info!(
            bet_id = %bet.id,
            account = %bet.account,
            asset = %bet.asset,
            direction = %bet.direction,
            amount = %bet.amount,
            window = %bet.window,
            start_price = bet.start_price,
            resolves_at = %bet.end_time,
            "Bet placed"
        );

        let _ = self.events.send(BetEvent::Created(bet.clone()));
        Ok(bet)
    }

    /// Settle a bet against the current price snapshot.
    ///
    /// Idempotent in effect: when the timer and the sweep race, the first
    /// caller performs the transition and the ledger submission; the
    /// second observes `InvalidTransition` and does nothing.
    pub async fn settle(&self, id: &str) -> Result<Bet, PriceActionError> {
        let bet = self.registry.get(id)?;
        if bet.is_terminal() {
            return Err(PriceActionError::InvalidTransition {
                id: id.to_string(),
                status: bet.status,
            });
        }

        // Never settle without a real snapshot; the next feed tick retries.
        let snapshot =
            self.feed
                .latest(bet.asset)
                .ok_or_else(|| PriceActionError::SettlementDeferred {
                    id: id.to_string(),
                    asset: bet.asset,
                })?;

        let end_price = snapshot.price;
        let status = outcome(bet.direction, bet.start_price, end_price);
        let settled = self.registry.update_terminal(id, end_price, status)?;

        self.submit_outcome(&settled).await;

        info!(
            bet_id = %settled.id,
            account = %settled.account,
            asset = %settled.asset,
            start_price = settled.start_price,
            end_price,
            status = %settled.status,
            "Bet settled"
        );

        let _ = self.events.send(BetEvent::Settled(settled.clone()));
        self.registry.prune_terminal(self.history_retention);
        Ok(settled)
    }

    /// Submit the settlement result to the external ledger.
    ///
    /// Failures here are reported but never roll back the terminal state:
    /// the bet's own state is locally authoritative, reconciliation with
    /// the ledger is an external concern.
    async fn submit_outcome(&self, bet: &Bet) {
        let result = if bet.status == BetStatus::Won {
            let payout = payout_for(bet.amount);
            match self.ledger.credit(&bet.account, payout).await {
                Ok(()) => {
                    self.ledger
                        .record_bet_win(&bet.account, payout, &bet.id)
                        .await
                }
                Err(e) => Err(e),
            }
        } else {
            self.ledger
                .record_bet_loss(&bet.account, bet.amount, &bet.id)
                .await
        };

        if let Err(e) = result {
            warn!(
                bet_id = %bet.id,
                account = %bet.account,
                error = %e,
                "Ledger submission failed after settlement"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
