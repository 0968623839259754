//! Shared types for the price-action betting engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the feed, registry,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A tradable asset whose price direction can be bet on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Btc,
    Sol,
}

impl Asset {
    /// All tracked assets (useful for iteration and feed refreshes).
    pub const ALL: &'static [Asset] = &[Asset::Btc, Asset::Sol];

    /// Identifier used by the external price source (CoinGecko).
    pub fn source_id(&self) -> &'static str {
        match self {
            Asset::Btc => "bitcoin",
            Asset::Sol => "solana",
        }
    }

    /// Ticker symbol for display and logging.
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Sol => "SOL",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Attempt to parse a string into an Asset (case-insensitive,
/// accepts both ticker symbols and price-source identifiers).
impl std::str::FromStr for Asset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Asset::Btc),
            "sol" | "solana" => Ok(Asset::Sol),
            _ => Err(anyhow::anyhow!("Unknown asset: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction & window
// ---------------------------------------------------------------------------

/// The price direction a bet predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Higher,
    Lower,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Higher => Direction::Lower,
            Direction::Lower => Direction::Higher,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Higher => write!(f, "HIGHER"),
            Direction::Lower => write!(f, "LOWER"),
        }
    }
}

/// Permitted betting windows. The set is closed at the type level so an
/// unsupported duration is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetWindow {
    OneMinute,
    FifteenMinutes,
}

impl BetWindow {
    pub const ALL: &'static [BetWindow] = &[BetWindow::OneMinute, BetWindow::FifteenMinutes];

    /// Window length in seconds.
    pub fn secs(&self) -> i64 {
        match self {
            BetWindow::OneMinute => 60,
            BetWindow::FifteenMinutes => 900,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.secs())
    }

    /// Look up a window by its length in seconds (how the UI sends it).
    pub fn from_secs(secs: i64) -> Option<Self> {
        BetWindow::ALL.iter().copied().find(|w| w.secs() == secs)
    }
}

impl fmt::Display for BetWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetWindow::OneMinute => write!(f, "1 min"),
            BetWindow::FifteenMinutes => write!(f, "15 min"),
        }
    }
}

// ---------------------------------------------------------------------------
// Price snapshot
// ---------------------------------------------------------------------------

/// An immutable point-in-time price reading. Replaced wholesale on each
/// successful fetch; never partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset: Asset,
    pub price: f64,
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Age of this snapshot relative to now.
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

impl fmt::Display for PriceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ${:.2} @ {}", self.asset, self.price, self.fetched_at)
    }
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// Bet lifecycle status. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Active,
    Won,
    Lost,
}

impl BetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BetStatus::Won | BetStatus::Lost)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Active => write!(f, "ACTIVE"),
            BetStatus::Won => write!(f, "WON"),
            BetStatus::Lost => write!(f, "LOST"),
        }
    }
}

/// A single wager on price direction over a fixed window.
///
/// Owned by the `BetRegistry` until terminal, then retained for the
/// history view. `amount`, `start_price`, and `end_time` are fixed at
/// creation; only the settlement path mutates a bet, once, to a terminal
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub asset: Asset,
    /// External account name; the account itself is not owned by this core.
    pub account: String,
    pub direction: Direction,
    /// Stake in BB. Positive for the lifetime of the bet.
    pub amount: Decimal,
    pub start_price: f64,
    /// Set if and only if the bet is terminal.
    pub end_price: Option<f64>,
    pub window: BetWindow,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BetStatus,
}

impl Bet {
    /// Create a new ACTIVE bet with a freshly generated identifier and
    /// `end_time = start_time + window`.
    pub fn new(
        account: &str,
        asset: Asset,
        direction: Direction,
        amount: Decimal,
        start_price: f64,
        window: BetWindow,
    ) -> Self {
        let start_time = Utc::now();
        Bet {
            id: format!("bet-{}", uuid::Uuid::new_v4()),
            asset,
            account: account.to_string(),
            direction,
            amount,
            start_price,
            end_price: None,
            window,
            start_time,
            end_time: start_time + window.duration(),
            status: BetStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BetStatus::Active
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the bet's window has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Time remaining until expiry. Zero once due.
    pub fn time_remaining(&self) -> Duration {
        (self.end_time - Utc::now()).max(Duration::zero())
    }

    /// Percentage move from start to end price, once settled.
    pub fn price_change_pct(&self) -> Option<f64> {
        self.end_price
            .map(|end| (end - self.start_price) / self.start_price * 100.0)
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} BB ({}) start=${:.2} {}",
            self.id,
            self.asset,
            self.direction,
            self.amount,
            self.window,
            self.start_price,
            self.status,
        )?;
        if let Some(end) = self.end_price {
            write!(f, " end=${end:.2}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle events emitted upward to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BetEvent {
    Created(Bet),
    Settled(Bet),
}

impl BetEvent {
    pub fn bet(&self) -> &Bet {
        match self {
            BetEvent::Created(bet) | BetEvent::Settled(bet) => bet,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the betting core.
///
/// Creation-time errors abort the bet with nothing persisted.
/// `SettlementDeferred` and `FeedUnavailable` are retried on the next feed
/// tick. `LedgerCallFailed` during settlement is reported but does not
/// block the terminal-state transition.
#[derive(Debug)]
pub enum PriceActionError {
    InvalidAmount { amount: Decimal },

    InsufficientBalance { needed: Decimal, available: Decimal },

    PriceUnavailable { asset: Asset },

    DuplicateId(String),

    NotFound(String),

    InvalidTransition { id: String, status: BetStatus },

    SettlementDeferred { id: String, asset: Asset },

    FeedUnavailable { source: String, message: String },

    LedgerCallFailed { operation: String, message: String },
}

impl std::fmt::Display for PriceActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceActionError::InvalidAmount { amount } => {
                write!(f, "Invalid bet amount: {amount} (must be positive)")
            }
            PriceActionError::InsufficientBalance { needed, available } => {
                write!(f, "Insufficient balance: need {needed} BB, have {available} BB")
            }
            PriceActionError::PriceUnavailable { asset } => {
                write!(f, "No price snapshot available yet for {asset}")
            }
            PriceActionError::DuplicateId(id) => write!(f, "Duplicate bet id: {id}"),
            PriceActionError::NotFound(id) => write!(f, "Bet not found: {id}"),
            PriceActionError::InvalidTransition { id, status } => {
                write!(f, "Invalid transition for bet {id}: already {status}")
            }
            PriceActionError::SettlementDeferred { id, asset } => {
                write!(f, "Settlement deferred for bet {id}: no {asset} snapshot")
            }
            PriceActionError::FeedUnavailable { source, message } => {
                write!(f, "Price feed unavailable ({source}): {message}")
            }
            PriceActionError::LedgerCallFailed { operation, message } => {
                write!(f, "Ledger call failed ({operation}): {message}")
            }
        }
    }
}

impl std::error::Error for PriceActionError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
