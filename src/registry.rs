//! In-memory bet registry.
//!
//! Holds every in-flight bet plus recently settled ones for the history
//! view, keyed by bet id. The registry is the single owner of bet state:
//! the terminal transition happens here, under one lock, which is what
//! makes the timer/sweep settlement race harmless.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{Bet, BetStatus, PriceActionError};

/// Registry of in-flight and recently settled bets.
pub struct BetRegistry {
    bets: Mutex<HashMap<String, Bet>>,
}

impl BetRegistry {
    pub fn new() -> Self {
        Self {
            bets: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a new bet. Fails with `DuplicateId` if the id already exists.
    pub fn insert(&self, bet: Bet) -> Result<(), PriceActionError> {
        let mut bets = self.bets.lock().expect("bet registry lock poisoned");
        if bets.contains_key(&bet.id) {
            return Err(PriceActionError::DuplicateId(bet.id));
        }
        debug!(bet_id = %bet.id, account = %bet.account, "Bet inserted");
        bets.insert(bet.id.clone(), bet);
        Ok(())
    }

    /// Look up a bet by id.
    pub fn get(&self, id: &str) -> Result<Bet, PriceActionError> {
        self.bets
            .lock()
            .expect("bet registry lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| PriceActionError::NotFound(id.to_string()))
    }

    /// Transition a bet to a terminal state, recording its end price.
    ///
    /// Fails with `InvalidTransition` unless the bet is currently ACTIVE —
    /// this is the guard that makes settlement idempotent when the timer
    /// and the sweep race for the same bet. Returns the settled bet.
    pub fn update_terminal(
        &self,
        id: &str,
        end_price: f64,
        status: BetStatus,
    ) -> Result<Bet, PriceActionError> {
        if !status.is_terminal() {
            return Err(PriceActionError::InvalidTransition {
                id: id.to_string(),
                status,
            });
        }

        let mut bets = self.bets.lock().expect("bet registry lock poisoned");
        let bet = bets
            .get_mut(id)
            .ok_or_else(|| PriceActionError::NotFound(id.to_string()))?;

        if bet.status != BetStatus::Active {
            return Err(PriceActionError::InvalidTransition {
                id: id.to_string(),
                status: bet.status,
            });
        }

        bet.end_price = Some(end_price);
        bet.status = status;
        Ok(bet.clone())
    }

    /// Ids of all currently active bets — a snapshot taken at call time,
    /// not a live view. Iterating it after concurrent mutation never
    /// observes a bet twice; it may reflect a slightly stale instant.
    pub fn active_ids(&self) -> Vec<String> {
        self.bets
            .lock()
            .expect("bet registry lock poisoned")
            .values()
            .filter(|b| b.is_active())
            .map(|b| b.id.clone())
            .collect()
    }

    /// Remove a bet entirely (explicit cancellation). Any timer still
    /// armed for it will find `NotFound` and do nothing.
    pub fn remove(&self, id: &str) -> Result<Bet, PriceActionError> {
        self.bets
            .lock()
            .expect("bet registry lock poisoned")
            .remove(id)
            .ok_or_else(|| PriceActionError::NotFound(id.to_string()))
    }

    /// All bets, most recent first — the ordering the history panel shows.
    pub fn all_sorted(&self) -> Vec<Bet> {
        let mut bets: Vec<Bet> = self
            .bets
            .lock()
            .expect("bet registry lock poisoned")
            .values()
            .cloned()
            .collect();
        bets.sort_by_key(|b| std::cmp::Reverse(b.start_time));
        bets
    }

    /// Evict terminal bets beyond the `keep` most recent ones. Active bets
    /// are never evicted. Returns the number of bets removed.
    pub fn prune_terminal(&self, keep: usize) -> usize {
        let mut bets = self.bets.lock().expect("bet registry lock poisoned");

        let mut terminal: Vec<(String, DateTime<Utc>)> = bets
            .values()
            .filter(|b| b.is_terminal())
            .map(|b| (b.id.clone(), b.start_time))
            .collect();

        if terminal.len() <= keep {
            return 0;
        }

        terminal.sort_by_key(|(_, start)| std::cmp::Reverse(*start));
        let evicted: Vec<String> = terminal.split_off(keep).into_iter().map(|(id, _)| id).collect();
        for id in &evicted {
            bets.remove(id);
        }
        debug!(evicted = evicted.len(), kept = keep, "Pruned settled bets");
        evicted.len()
    }

    pub fn len(&self) -> usize {
        self.bets.lock().expect("bet registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
