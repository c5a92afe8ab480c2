use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named payout destination holding a percentage share of incoming funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub percentage: u32,
    pub address: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientUpdate {
    pub name: Option<String>,
    pub percentage: Option<u32>,
    pub address: Option<String>,
}
