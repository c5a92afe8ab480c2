pub mod allocation;
pub mod money;
pub mod recipient;
pub mod transaction;

pub use allocation::{Allocation, AllocationStatus, Withdrawal, WithdrawableBalance};
pub use money::Money;
pub use recipient::{Recipient, RecipientUpdate};
pub use transaction::{NewTransaction, Transaction};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdc,
    Usdt,
    Brl,
    Usd,
}

impl Currency {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USDC" => Some(Currency::Usdc),
            "USDT" => Some(Currency::Usdt),
            "BRL" => Some(Currency::Brl),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }

    /// Number of decimal places of the currency's minor unit.
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::Usdc | Currency::Usdt | Currency::Brl | Currency::Usd => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usdc => write!(f, "USDC"),
            Currency::Usdt => write!(f, "USDT"),
            Currency::Brl => write!(f, "BRL"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "incoming" | "in" => Some(Direction::Incoming),
            "outgoing" | "out" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "processing" => Some(TransactionStatus::Processing),
            "confirmed" => Some(TransactionStatus::Confirmed),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    /// Confirmed and Failed never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Confirmed)
                | (Pending, Failed)
                | (Processing, Confirmed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Processing => write!(f, "processing"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}
