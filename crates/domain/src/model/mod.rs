//! Data structures shared between the analyzer, the storage adapters and the
//! monitor binary.

use std::{collections::HashSet, time::Duration};

use serde::Serialize;

/// A token balance reading for one (owner, mint) pair at a fixed point in a
/// transaction (before or after execution).
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalanceSnapshot {
    pub owner: String,
    pub mint: String,
    /// Human-scaled amount, already adjusted for the mint's decimals.
    pub ui_amount: f64,
}

impl TokenBalanceSnapshot {
    pub fn new(owner: impl Into<String>, mint: impl Into<String>, ui_amount: f64) -> Self {
        Self {
            owner: owner.into(),
            mint: mint.into(),
            ui_amount,
        }
    }
}

/// Direction of a balance change from the watched owner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// A single normalized balance change derived from a pre/post pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceChangeEvent {
    #[serde(rename = "token_address")]
    pub mint: String,
    pub action: TradeAction,
    /// Magnitude of the change, never negative.
    pub amount: f64,
}

/// Immutable set of owner addresses whose balances are tracked.
///
/// Built once when a session starts and shared read-only by every handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    owners: HashSet<String>,
}

impl WatchSet {
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owners: owners.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains(owner)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Outcome of analyzing one transaction update, handed to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReport {
    pub signature: String,
    pub slot: u64,
    pub analysis_time: Duration,
    pub events: Vec<BalanceChangeEvent>,
}
