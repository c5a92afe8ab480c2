use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Direction, Money, TransactionStatus};

/// One incoming or outgoing transfer as recorded by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub direction: Direction,
    pub money: Money,
    pub status: TransactionStatus,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_confirmed_incoming(&self) -> bool {
        self.direction == Direction::Incoming && self.status == TransactionStatus::Confirmed
    }

    /// Case-insensitive match on hash, currency or network.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.hash.to_lowercase().contains(&q)
            || self.money.currency.to_string().to_lowercase().contains(&q)
            || self.money.network.to_lowercase().contains(&q)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction: id={} direction={} money={} status={} hash={}",
            self.id, self.direction, self.money, self.status, self.hash,
        )
    }
}

/// Input accepted by `TransactionLog::record`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub direction: Direction,
    pub money: Money,
    pub hash: String,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn incoming(money: Money, hash: impl Into<String>) -> Self {
        Self {
            direction: Direction::Incoming,
            money,
            hash: hash.into(),
            status: None,
            created_at: None,
        }
    }

    pub fn outgoing(money: Money, hash: impl Into<String>) -> Self {
        Self {
            direction: Direction::Outgoing,
            ..Self::incoming(money, hash)
        }
    }
}
