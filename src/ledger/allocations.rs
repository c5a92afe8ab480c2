use std::collections::HashMap;

use uuid::Uuid;

use super::LedgerError;
use crate::models::{Allocation, Withdrawal};

/// Store of allocations with a unique index on transaction id, plus the
/// history of withdrawals made against them.
#[derive(Debug, Default)]
pub struct AllocationBook {
    pub(super) allocations: Vec<Allocation>,
    pub(super) by_id: HashMap<Uuid, usize>,
    pub(super) by_transaction: HashMap<Uuid, Vec<Uuid>>,
    pub(super) withdrawals: Vec<Withdrawal>,
}

impl AllocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allocated(&self, transaction_id: Uuid) -> bool {
        self.by_transaction.contains_key(&transaction_id)
    }

    /// Store the allocations of one transaction. A transaction can be
    /// inserted once, even when its split produced no rows.
    pub fn insert(
        &mut self,
        transaction_id: Uuid,
        allocations: Vec<Allocation>,
    ) -> Result<&[Allocation], LedgerError> {
        if self.is_allocated(transaction_id) {
            return Err(LedgerError::AlreadyAllocated(transaction_id));
        }
        debug_assert!(allocations.iter().all(|a| a.transaction_id == transaction_id));

        let start = self.allocations.len();
        let ids = allocations.iter().map(|a| a.id).collect();
        for allocation in allocations {
            self.by_id.insert(allocation.id, self.allocations.len());
            self.allocations.push(allocation);
        }
        self.by_transaction.insert(transaction_id, ids);

        Ok(&self.allocations[start..])
    }

    pub fn get(&self, id: Uuid) -> Option<&Allocation> {
        self.by_id.get(&id).map(|&i| &self.allocations[i])
    }

    pub fn for_transaction(&self, transaction_id: Uuid) -> Vec<Allocation> {
        self.by_transaction
            .get(&transaction_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllocationStatus, Currency, Money};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn allocation(transaction_id: Uuid) -> Allocation {
        Allocation {
            id: Uuid::new_v4(),
            transaction_id,
            recipient_id: Uuid::new_v4(),
            recipient_name: "Merchant".into(),
            payout_address: "0x9i0j".into(),
            money: Money::new(Decimal::new(500, 2), Currency::Usdc, "BSC").unwrap(),
            config_snapshot_id: Uuid::new_v4(),
            status: AllocationStatus::Withdrawable,
            created_at: Utc::now(),
            withdrawn_at: None,
            withdrawal_id: None,
        }
    }

    #[test]
    fn test_second_insert_for_transaction_rejected() {
        let mut book = AllocationBook::new();
        let tx = Uuid::new_v4();

        book.insert(tx, vec![allocation(tx), allocation(tx)]).unwrap();
        let result = book.insert(tx, vec![allocation(tx)]);

        assert!(matches!(result, Err(LedgerError::AlreadyAllocated(id)) if id == tx));
        assert_eq!(book.len(), 2);
        assert_eq!(book.for_transaction(tx).len(), 2);
    }

    #[test]
    fn test_empty_insert_still_marks_transaction() {
        let mut book = AllocationBook::new();
        let tx = Uuid::new_v4();
        book.insert(tx, Vec::new()).unwrap();
        assert!(book.is_allocated(tx));
        assert!(book.is_empty());
    }
}
