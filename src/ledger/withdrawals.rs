use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{AllocationBook, LedgerError};
use crate::models::{
    Allocation, AllocationStatus, Currency, Money, Withdrawal, WithdrawableBalance,
};

impl AllocationBook {
    /// Withdrawable allocations of a recipient, newest first.
    pub fn list_withdrawable(&self, recipient_id: Uuid) -> Vec<Allocation> {
        let mut list: Vec<Allocation> = self
            .allocations
            .iter()
            .rev()
            .filter(|a| a.recipient_id == recipient_id && a.is_withdrawable())
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Mark a batch of a recipient's allocations as withdrawn, all or nothing.
    pub fn withdraw(
        &mut self,
        recipient_id: Uuid,
        allocation_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, LedgerError> {
        let Some(first) = allocation_ids.first() else {
            return Err(LedgerError::not_found("allocation", "empty batch"));
        };

        // Validate the whole batch before mutating anything
        let mut seen = HashSet::with_capacity(allocation_ids.len());
        let mut indices = Vec::with_capacity(allocation_ids.len());
        let mut total: Option<Money> = None;

        for id in allocation_ids {
            let index = *self
                .by_id
                .get(id)
                .ok_or_else(|| LedgerError::not_found("allocation", id))?;
            let allocation = &self.allocations[index];

            if allocation.recipient_id != recipient_id {
                return Err(LedgerError::not_found("allocation", id));
            }
            if !allocation.is_withdrawable() || !seen.insert(*id) {
                return Err(LedgerError::AlreadyWithdrawn(*id));
            }

            total = Some(match total {
                None => allocation.money.clone(),
                Some(sum) => sum.checked_add(&allocation.money)?,
            });
            indices.push(index);
        }

        let total = total.ok_or_else(|| LedgerError::not_found("allocation", first))?;
        let withdrawal = Withdrawal {
            id: Uuid::new_v4(),
            recipient_id,
            allocation_ids: allocation_ids.to_vec(),
            total,
            created_at: now,
        };

        for index in indices {
            let allocation = &mut self.allocations[index];
            allocation.status = AllocationStatus::Withdrawn;
            allocation.withdrawn_at = Some(now);
            allocation.withdrawal_id = Some(withdrawal.id);
        }

        tracing::info!(
            target: "audit",
            withdrawal_id = %withdrawal.id,
            recipient_id = %recipient_id,
            allocations = withdrawal.allocation_ids.len(),
            total = %withdrawal.total,
            "Allocations withdrawn"
        );

        self.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }

    /// Withdrawable totals per recipient and currency.
    pub fn balances(&self) -> Result<Vec<WithdrawableBalance>, LedgerError> {
        let mut grouped: BTreeMap<(Uuid, Currency), WithdrawableBalance> = BTreeMap::new();

        for allocation in self.allocations.iter().filter(|a| a.is_withdrawable()) {
            let entry = grouped
                .entry((allocation.recipient_id, allocation.money.currency))
                .or_insert_with(|| WithdrawableBalance {
                    recipient_id: allocation.recipient_id,
                    recipient_name: allocation.recipient_name.clone(),
                    currency: allocation.money.currency,
                    amount: Decimal::ZERO,
                    allocation_count: 0,
                });
            // Later allocations carry the most recent display name
            entry.recipient_name = allocation.recipient_name.clone();
            entry.amount = entry
                .amount
                .checked_add(allocation.money.amount)
                .ok_or_else(|| {
                    LedgerError::InvalidAmount(format!(
                        "withdrawable {} balance of {} overflows",
                        allocation.money.currency, allocation.recipient_id
                    ))
                })?;
            entry.allocation_count += 1;
        }

        Ok(grouped.into_values().collect())
    }

    pub fn balance(&self, recipient_id: Uuid) -> Result<Vec<WithdrawableBalance>, LedgerError> {
        Ok(self
            .balances()?
            .into_iter()
            .filter(|b| b.recipient_id == recipient_id)
            .collect())
    }

    /// Past withdrawals, newest first.
    pub fn history(&self) -> Vec<Withdrawal> {
        self.withdrawals.iter().rev().cloned().collect()
    }
}
