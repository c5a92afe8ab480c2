use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Withdrawable,
    Withdrawn,
}

/// Share of one confirmed incoming transaction credited to one recipient.
///
/// Amount, recipient and snapshot are fixed at creation; only the withdrawal
/// fields are filled in, once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub payout_address: String,
    pub money: Money,
    pub config_snapshot_id: Uuid,
    pub status: AllocationStatus,
    pub created_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub withdrawal_id: Option<Uuid>,
}

impl Allocation {
    pub fn is_withdrawable(&self) -> bool {
        self.status == AllocationStatus::Withdrawable
    }
}

/// Receipt for one successful withdraw batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub allocation_ids: Vec<Uuid>,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// Withdrawable funds of one recipient in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawableBalance {
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub allocation_count: usize,
}
