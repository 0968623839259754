//! Mock ledger for integration testing.
//!
//! Provides a deterministic `Ledger` implementation that tracks balances,
//! records every debit, credit, and bet outcome submission, and can be
//! forced to fail — all in-memory with no external dependencies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use priceaction::ledger::Ledger;
use priceaction::types::PriceActionError;

/// One recorded bet outcome submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub account: String,
    pub bet_id: String,
    pub amount: Decimal,
    pub won: bool,
}

/// A mock external ledger. All state is controllable from test code.
pub struct MockLedger {
    balances: Mutex<HashMap<String, Decimal>>,
    debits: Mutex<Vec<(String, Decimal)>>,
    credits: Mutex<Vec<(String, Decimal)>>,
    outcomes: Mutex<Vec<OutcomeRecord>>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            balances: Mutex::new(HashMap::new()),
            debits: Mutex::new(Vec::new()),
            credits: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
        })
    }

    /// A ledger with one funded account.
    pub fn with_account(name: &str, balance: Decimal) -> Arc<Self> {
        let ledger = Self::new();
        ledger.balances.lock().unwrap().insert(name.to_string(), balance);
        ledger
    }

    pub fn set_balance(&self, name: &str, balance: Decimal) {
        self.balances.lock().unwrap().insert(name.to_string(), balance);
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn debits(&self) -> Vec<(String, Decimal)> {
        self.debits.lock().unwrap().clone()
    }

    pub fn credits(&self) -> Vec<(String, Decimal)> {
        self.credits.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<OutcomeRecord> {
        self.outcomes.lock().unwrap().clone()
    }

    fn check_error(&self, operation: &str) -> Result<(), PriceActionError> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(PriceActionError::LedgerCallFailed {
                operation: operation.to_string(),
                message: err.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn balance(&self, account: &str) -> Result<Decimal, PriceActionError> {
        self.check_error("balance")?;
        self.balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .ok_or_else(|| PriceActionError::LedgerCallFailed {
                operation: "balance".to_string(),
                message: format!("unknown account: {account}"),
            })
    }

    async fn debit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError> {
        self.check_error("debit")?;
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.get_mut(account).ok_or_else(|| {
            PriceActionError::LedgerCallFailed {
                operation: "debit".to_string(),
                message: format!("unknown account: {account}"),
            }
        })?;
        if *balance < amount {
            return Err(PriceActionError::LedgerCallFailed {
                operation: "debit".to_string(),
                message: format!("insufficient funds: need {amount}, have {balance}"),
            });
        }
        *balance -= amount;
        self.debits.lock().unwrap().push((account.to_string(), amount));
        Ok(())
    }

    async fn credit(&self, account: &str, amount: Decimal) -> Result<(), PriceActionError> {
        self.check_error("credit")?;
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.get_mut(account).ok_or_else(|| {
            PriceActionError::LedgerCallFailed {
                operation: "credit".to_string(),
                message: format!("unknown account: {account}"),
            }
        })?;
        *balance += amount;
        self.credits.lock().unwrap().push((account.to_string(), amount));
        Ok(())
    }

    async fn record_bet_win(
        &self,
        account: &str,
        amount: Decimal,
        bet_id: &str,
    ) -> Result<(), PriceActionError> {
        self.check_error("record_bet_win")?;
        self.outcomes.lock().unwrap().push(OutcomeRecord {
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
        self.check_error("record_bet_loss")?;
        self.outcomes.lock().unwrap().push(OutcomeRecord {
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_balance_and_debit() {
        let ledger = MockLedger::with_account("alice", dec!(100));
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(100));

        ledger.debit("alice", dec!(30)).await.unwrap();
        assert_eq!(ledger.balance("alice").await.unwrap(), dec!(70));
        assert_eq!(ledger.debits(), vec![("alice".to_string(), dec!(30))]);
    }

    #[tokio::test]
    async fn test_mock_debit_overdraft() {
        let ledger = MockLedger::with_account("alice", dec!(5));
        let result = ledger.debit("alice", dec!(10)).await;
        assert!(result.is_err());
        assert!(ledger.debits().is_empty());
    }

    #[tokio::test]
    async fn test_mock_forced_error() {
        let ledger = MockLedger::with_account("alice", dec!(100));
        ledger.set_error("simulated backend outage");

        assert!(ledger.balance("alice").await.is_err());
        assert!(ledger.debit("alice", dec!(1)).await.is_err());
        assert!(ledger.record_bet_win("alice", dec!(2), "bet-1").await.is_err());

        ledger.clear_error();
        assert!(ledger.balance("alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_outcome_records() {
        let ledger = MockLedger::with_account("alice", dec!(100));
        ledger.record_bet_win("alice", dec!(20), "bet-1").await.unwrap();
        ledger.record_bet_loss("alice", dec!(10), "bet-2").await.unwrap();

        let outcomes = ledger.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].won);
        assert!(!outcomes[1].won);
    }
}
