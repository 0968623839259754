//! External ledger interface.
//!
//! The authoritative balances and bet audit trail live in the remote
//! backend; this core only consumes a handful of operations from it.
//! `Ledger` abstracts that backend. Implementations must bound their
//! wait (transport timeout) and surface failures as `LedgerCallFailed`
//! rather than hanging the event loop.
//!
//! `InMemoryLedger` is a local stand-in used by the binary and by the
//! integration scenarios.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::PriceActionError;

/// Operations this core needs from the external ledger.
///
/// `debit`/`credit` move funds; `record_bet_win`/`record_bet_loss` feed
/// the backend's audit trail and do not move funds themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance of an account.
    async fn balance(&self, account: &str) -> Result<Decimal, PriceActionError>;

    /// Deduct `amount` from an account.
    async fn debit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError>;

    /// Add `amount` to an account.
    async fn credit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError>;

    /// Record a won bet (payout already credited separately).
    async fn record_bet_win(
        &self,
        account: &str,
        amount: Decimal,
        bet_id: &str,
    ) -> Result<(), PriceActionError>;

    /// Record a lost bet (stake already debited at placement).
    async fn record_bet_loss(
        &self,
        account: &str,
        amount: Decimal,
        bet_id: &str,
    ) -> Result<(), PriceActionError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// An audit-trail entry for a settled bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRecord {
    pub account: String,
    pub bet_id: String,
    pub amount: Decimal,
    pub won: bool,
}

/// In-memory ledger with named accounts and a bet audit trail.
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<String, Decimal>>,
    records: Mutex<Vec<BetRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Create or top up an account.
    pub fn open_account(&self, name: &str, balance: Decimal) {
        let mut accounts = self.accounts.lock().expect("ledger lock poisoned");
        *accounts.entry(name.to_string()).or_insert(Decimal::ZERO) += balance;
    }

    /// All bet outcome records, in submission order.
    pub fn records(&self) -> Vec<BetRecord> {
        self.records.lock().expect("ledger lock poisoned").clone()
    }

    fn failed(operation: &str, message: String) -> PriceActionError {
        PriceActionError::LedgerCallFailed {
            operation: operation.to_string(),
            message,
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance(&self, account: &str) -> Result<Decimal, PriceActionError> {
        self.accounts
            .lock()
            .expect("ledger lock poisoned")
            .get(account)
            .copied()
            .ok_or_else(|| Self::failed("balance", format!("unknown account: {account}")))
    }

    async fn debit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError> {
        let mut accounts = self.accounts.lock().expect("ledger lock poisoned");
        let balance = accounts
            .get_mut(account)
            .ok_or_else(|| Self::failed("debit", format!("unknown account: {account}")))?;
        if *balance < amount {
            return Err(Self::failed(
                "debit",
                format!("insufficient funds: need {amount}, have {balance}"),
            ));
        }
        *balance -= amount;
        debug!(%account, %amount, remaining = %balance, "Ledger debit");
        Ok(())
    }

    async fn credit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError> {
        let mut accounts = self.accounts.lock().expect("ledger lock poisoned");
        let balance = accounts
            .get_mut(account)
            .ok_or_else(|| Self::failed("credit", format!("unknown account: {account}")))?;
        *balance += amount;
        debug!(%account, %amount, new_balance = %balance, "Ledger credit");
        Ok(())
    }

    async fn record_bet_win(
        &self,
        account: &str,
        amount: Decimal,
        bet_id: &str,
    ) -> Result<(), PriceActionError> {
        self.records.lock().expect("ledger lock poisoned").push(BetRecord {
            account: account.to_string(),
            bet_id: bet_id.to_string(),
            amount,
            won: true,
        });
        Ok(())
    }

    async fn record_bet_loss(
        &self,
        account: &str,
        amount: Decimal,
        bet_id: &str,
    ) -> Result<(), PriceActionError> {
        self.records.lock().expect("ledger lock poisoned").push(BetRecord {
            account: account.to_string(),
            bet_id: bet_id.to_string(),
            amount,
            won: false,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
