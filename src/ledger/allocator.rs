use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use super::split_config::FULL_SPLIT_PERCENTAGE;
use super::{LedgerError, SplitConfiguration};
use crate::models::{
    Allocation, AllocationStatus, Direction, Recipient, Transaction, TransactionStatus,
};

/// Divide `amount` among `recipients` by percentage.
///
/// Each share is floored to `minor_units` decimal places and whatever is left
/// over goes to the last recipient, so the shares always sum to `amount`.
/// Returns one entry per recipient, in order, zero shares included, or
/// `InvalidAmount` if any intermediate value is not representable.
pub fn split_amount(
    amount: Decimal,
    minor_units: u32,
    recipients: &[Recipient],
) -> Result<Vec<Decimal>, LedgerError> {
    let Some(last) = recipients.len().checked_sub(1) else {
        return Ok(Vec::new());
    };

    let overflow = || LedgerError::InvalidAmount(format!("amount {amount} overflows the split"));
    let hundred = Decimal::from(FULL_SPLIT_PERCENTAGE);

    let mut shares = Vec::with_capacity(recipients.len());
    let mut floored = Decimal::ZERO;
    for recipient in recipients {
        let share = amount
            .checked_mul(Decimal::from(recipient.percentage))
            .and_then(|scaled| scaled.checked_div(hundred))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(minor_units, RoundingStrategy::ToZero);
        floored = floored.checked_add(share).ok_or_else(overflow)?;
        shares.push(share);
    }

    let remainder = amount.checked_sub(floored).ok_or_else(overflow)?;
    shares[last] = shares[last].checked_add(remainder).ok_or_else(overflow)?;
    for share in &mut shares {
        share.rescale(minor_units);
    }
    Ok(shares)
}

/// Compute the allocations of a confirmed incoming transaction under the
/// current split, freezing the split revision it was computed from.
///
/// Only checks the transaction and configuration; uniqueness per transaction
/// is enforced by [`super::AllocationBook::insert`].
pub fn allocate(
    transaction: &Transaction,
    config: &mut SplitConfiguration,
    now: DateTime<Utc>,
) -> Result<Vec<Allocation>, LedgerError> {
    if transaction.direction != Direction::Incoming {
        return Err(rejected(transaction, "only incoming transactions are split".into()));
    }
    if transaction.status != TransactionStatus::Confirmed {
        return Err(rejected(
            transaction,
            format!("transaction is {}, not confirmed", transaction.status),
        ));
    }
    if !config.is_valid() {
        return Err(rejected(
            transaction,
            format!(
                "split configuration is invalid ({}% across {} recipients)",
                config.total_percentage(),
                config.recipients().len()
            ),
        ));
    }

    // Shares first: a failed split must not freeze a snapshot
    let money = &transaction.money;
    let shares = split_amount(money.amount, money.currency.minor_units(), config.recipients())?;
    let snapshot = config.freeze(now);

    let allocations = snapshot
        .recipients
        .iter()
        .zip(shares)
        .filter(|(_, share)| *share > Decimal::ZERO)
        .map(|(recipient, share)| Allocation {
            id: Uuid::new_v4(),
            transaction_id: transaction.id,
            recipient_id: recipient.id,
            recipient_name: recipient.name.clone(),
            payout_address: recipient.address.clone(),
            money: money.with_amount(share),
            config_snapshot_id: snapshot.id,
            status: AllocationStatus::Withdrawable,
            created_at: now,
            withdrawn_at: None,
            withdrawal_id: None,
        })
        .collect();

    Ok(allocations)
}

fn rejected(transaction: &Transaction, reason: String) -> LedgerError {
    LedgerError::AllocationRejected {
        transaction_id: transaction.id,
        reason,
    }
}
