use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use super::events::{AllocationBatch, LedgerEvent};
use super::{
    allocator, AllocationBook, ConfigSnapshot, LedgerError, SplitConfiguration, SplitSummary,
    TransactionLog,
};
use crate::models::{
    Allocation, Direction, NewTransaction, Recipient, RecipientUpdate, Transaction,
    TransactionStatus, Withdrawal, WithdrawableBalance,
};

/// Runtime switches for a [`SplitLedger`].
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Allocate on confirm, and retry pending transactions whenever the
    /// split becomes valid again.
    pub auto_allocate: bool,
    /// Capacity of the change-event broadcast channel.
    pub event_buffer: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            auto_allocate: true,
            event_buffer: 256,
        }
    }
}

/// Feed filter for the transaction history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub q: Option<String>,
    pub direction: Option<Direction>,
    pub status: Option<TransactionStatus>,
}

/// Result of a confirmation: the transaction plus whatever auto-allocation
/// produced. `allocation_error` explains why funds are still unallocated.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub transaction: Transaction,
    pub allocations: Vec<Allocation>,
    pub allocation_error: Option<String>,
}

/// Result of a split edit, including allocations retried because of it.
#[derive(Debug, Clone, Serialize)]
pub struct SplitChange {
    pub recipient: Recipient,
    pub split: SplitSummary,
    pub allocated: Vec<Allocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalOutcome {
    pub withdrawal: Withdrawal,
    pub balance: Vec<WithdrawableBalance>,
}

/// The single owner of ledger state.
///
/// All mutations run their checks and writes under one lock acquisition, so
/// racing `allocate` calls for one transaction or overlapping `withdraw`
/// batches have exactly one winner. Change events are published before the
/// lock is released, so `/ws` subscribers see them in commit order. Reads
/// clone what they need and release the lock immediately.
#[derive(Clone)]
pub struct SplitLedger {
    inner: Arc<Mutex<LedgerState>>,
    events: broadcast::Sender<LedgerEvent>,
    options: LedgerOptions,
}

#[derive(Default)]
struct LedgerState {
    transactions: TransactionLog,
    split: SplitConfiguration,
    book: AllocationBook,
    /// Confirmed incoming transactions with no allocations yet, keyed oldest first.
    pending: BTreeSet<(DateTime<Utc>, Uuid)>,
}

impl SplitLedger {
    pub fn new(options: LedgerOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_buffer.max(1));
        Self {
            inner: Arc::new(Mutex::new(LedgerState::default())),
            events,
            options,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    pub async fn record(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        let mut state = self.inner.lock().await;
        let tx = match state.transactions.record(new, Utc::now()) {
            Ok(tx) => tx.clone(),
            Err(e) => {
                if let LedgerError::DuplicateHash(hash) = &e {
                    counter!("duplicate_hashes_total").increment(1);
                    tracing::debug!(hash = %hash, "Transaction hash already recorded");
                }
                return Err(e);
            }
        };
        self.publish(LedgerEvent::TransactionRecorded(tx.clone()));
        drop(state);

        counter!("transactions_recorded_total").increment(1);
        tracing::info!(
            target: "audit",
            transaction_id = %tx.id,
            direction = %tx.direction,
            money = %tx.money,
            status = %tx.status,
            hash = %tx.hash,
            "Transaction recorded"
        );
        Ok(tx)
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        let mut state = self.inner.lock().await;
        let tx = state
            .transactions
            .mark_processing(id, Utc::now())
            .map_err(log_transition_error)?
            .clone();
        self.publish(LedgerEvent::TransactionUpdated(tx.clone()));
        drop(state);

        tracing::info!(target: "audit", transaction_id = %id, "Transaction processing");
        Ok(tx)
    }

    /// Confirm a transaction; incoming funds are allocated right away when
    /// auto-allocation is on and the split is valid.
    pub async fn confirm(&self, id: Uuid) -> Result<Confirmation, LedgerError> {
        let mut state = self.inner.lock().await;
        let now = Utc::now();
        let tx = state
            .transactions
            .confirm(id, now)
            .map_err(log_transition_error)?
            .clone();
        if tx.is_confirmed_incoming() {
            state.pending.insert((tx.created_at, id));
        }

        let (allocations, allocation_error) =
            if self.options.auto_allocate && tx.direction == Direction::Incoming {
                match state.allocate_one(id) {
                    Ok(allocations) => (allocations, None),
                    Err(e) => {
                        tracing::warn!(
                            transaction_id = %id,
                            error = %e,
                            "Confirmed funds left unallocated"
                        );
                        (Vec::new(), Some(e.to_string()))
                    }
                }
            } else {
                (Vec::new(), None)
            };
        state.report_pending();
        self.publish(LedgerEvent::TransactionUpdated(tx.clone()));
        if allocation_error.is_none() && tx.is_confirmed_incoming() && self.options.auto_allocate {
            self.publish(LedgerEvent::AllocationsCreated(AllocationBatch {
                transaction_id: id,
                allocations: allocations.clone(),
            }));
        }
        drop(state);

        counter!("transactions_confirmed_total").increment(1);
        tracing::info!(
            target: "audit",
            transaction_id = %id,
            money = %tx.money,
            allocations = allocations.len(),
            "Transaction confirmed"
        );

        Ok(Confirmation {
            transaction: tx,
            allocations,
            allocation_error,
        })
    }

    pub async fn fail(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        let mut state = self.inner.lock().await;
        let tx = state
            .transactions
            .fail(id, Utc::now())
            .map_err(log_transition_error)?
            .clone();
        self.publish(LedgerEvent::TransactionUpdated(tx.clone()));
        drop(state);

        counter!("transactions_failed_total").increment(1);
        tracing::info!(target: "audit", transaction_id = %id, "Transaction failed");
        Ok(tx)
    }

    pub async fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.inner.lock().await.transactions.get(id).cloned()
    }

    pub async fn transaction_by_hash(&self, hash: &str) -> Option<Transaction> {
        self.inner.lock().await.transactions.find_by_hash(hash).cloned()
    }

    /// Transaction history, newest first.
    pub async fn transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let all = {
            let state = self.inner.lock().await;
            state.transactions.search(filter.q.as_deref().unwrap_or_default())
        };
        all.into_iter()
            .filter(|tx| filter.direction.map_or(true, |d| tx.direction == d))
            .filter(|tx| filter.status.map_or(true, |s| tx.status == s))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Split configuration
    // -----------------------------------------------------------------------

    pub async fn split(&self) -> SplitSummary {
        self.inner.lock().await.split.summary()
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<ConfigSnapshot> {
        self.inner.lock().await.split.snapshot(id).cloned()
    }

    pub async fn add_recipient(
        &self,
        name: &str,
        percentage: u32,
        address: &str,
    ) -> Result<SplitChange, LedgerError> {
        self.edit_split(|split| {
            split.add_recipient(name, percentage, address)?;
            Ok(split.recipients()[split.recipients().len() - 1].clone())
        })
        .await
    }

    pub async fn update_recipient(
        &self,
        id: Uuid,
        update: RecipientUpdate,
    ) -> Result<SplitChange, LedgerError> {
        self.edit_split(|split| split.update_recipient(id, update).cloned())
            .await
    }

    pub async fn remove_recipient(&self, id: Uuid) -> Result<SplitChange, LedgerError> {
        self.edit_split(|split| split.remove_recipient(id)).await
    }

    async fn edit_split<F>(&self, edit: F) -> Result<SplitChange, LedgerError>
    where
        F: FnOnce(&mut SplitConfiguration) -> Result<Recipient, LedgerError>,
    {
        let mut state = self.inner.lock().await;
        let recipient = edit(&mut state.split)?;
        let split = state.split.summary();

        let allocated = if self.options.auto_allocate && split.is_valid {
            state.allocate_pending()
        } else {
            Vec::new()
        };
        state.report_pending();
        self.publish(LedgerEvent::SplitUpdated(split.clone()));
        self.publish_batches(&allocated);
        drop(state);

        gauge!("split_total_percentage").set(split.total_percentage as f64);
        gauge!("split_recipients").set(split.recipients.len() as f64);
        if !split.is_valid {
            tracing::warn!(
                total_percentage = split.total_percentage,
                recipients = split.recipients.len(),
                "Split configuration is not valid, new funds will not be allocated"
            );
        }

        Ok(SplitChange {
            recipient,
            split,
            allocated,
        })
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    pub async fn allocate(&self, transaction_id: Uuid) -> Result<Vec<Allocation>, LedgerError> {
        let mut state = self.inner.lock().await;
        let result = state.allocate_one(transaction_id);
        state.report_pending();

        let allocations = result?;
        self.publish(LedgerEvent::AllocationsCreated(AllocationBatch {
            transaction_id,
            allocations: allocations.clone(),
        }));
        Ok(allocations)
    }

    /// Allocate every confirmed incoming transaction still waiting for a
    /// valid split. Returns the allocations created.
    pub async fn allocate_pending(&self) -> Vec<Allocation> {
        let mut state = self.inner.lock().await;
        let allocated = state.allocate_pending();
        state.report_pending();
        self.publish_batches(&allocated);
        allocated
    }

    pub async fn allocations_for(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<Allocation>, LedgerError> {
        let state = self.inner.lock().await;
        if state.transactions.get(transaction_id).is_none() {
            return Err(LedgerError::not_found("transaction", transaction_id));
        }
        Ok(state.book.for_transaction(transaction_id))
    }

    pub async fn pending_allocation_count(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    fn publish_batches(&self, allocations: &[Allocation]) {
        let mut batches: Vec<AllocationBatch> = Vec::new();
        for allocation in allocations {
            match batches.last_mut() {
                Some(batch) if batch.transaction_id == allocation.transaction_id => {
                    batch.allocations.push(allocation.clone());
                }
                _ => batches.push(AllocationBatch {
                    transaction_id: allocation.transaction_id,
                    allocations: vec![allocation.clone()],
                }),
            }
        }
        for batch in batches {
            self.publish(LedgerEvent::AllocationsCreated(batch));
        }
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    pub async fn list_withdrawable(&self, recipient_id: Uuid) -> Vec<Allocation> {
        self.inner.lock().await.book.list_withdrawable(recipient_id)
    }

    pub async fn withdraw(
        &self,
        recipient_id: Uuid,
        allocation_ids: &[Uuid],
    ) -> Result<WithdrawalOutcome, LedgerError> {
        let mut state = self.inner.lock().await;
        // Sums over a subset of these cannot overflow once the batch is withdrawn
        state.book.balance(recipient_id)?;
        let withdrawal = state
            .book
            .withdraw(recipient_id, allocation_ids, Utc::now())?;
        let balance = state.book.balance(recipient_id)?;
        self.publish(LedgerEvent::Withdrawal(withdrawal.clone()));
        drop(state);

        counter!("withdrawals_total").increment(1);

        Ok(WithdrawalOutcome {
            withdrawal,
            balance,
        })
    }

    pub async fn balances(&self) -> Result<Vec<WithdrawableBalance>, LedgerError> {
        self.inner.lock().await.book.balances()
    }

    pub async fn balance(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<WithdrawableBalance>, LedgerError> {
        self.inner.lock().await.book.balance(recipient_id)
    }

    pub async fn withdrawals(&self) -> Vec<Withdrawal> {
        self.inner.lock().await.book.history()
    }
}

impl LedgerState {
    /// Allocate one transaction. Checked in order: unknown id, already
    /// allocated, transaction state, split validity.
    fn allocate_one(&mut self, transaction_id: Uuid) -> Result<Vec<Allocation>, LedgerError> {
        let start = Instant::now();
        let tx = self
            .transactions
            .get(transaction_id)
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;

        if self.book.is_allocated(transaction_id) {
            return Err(LedgerError::AlreadyAllocated(transaction_id));
        }
        let pending_key = (tx.created_at, transaction_id);

        let allocations = match allocator::allocate(tx, &mut self.split, Utc::now()) {
            Ok(allocations) => allocations,
            Err(e) => {
                counter!("allocations_rejected_total").increment(1);
                return Err(e);
            }
        };
        let stored = self.book.insert(transaction_id, allocations)?.to_vec();
        self.pending.remove(&pending_key);

        counter!("allocations_created_total").increment(stored.len() as u64);
        histogram!("allocation_latency_seconds").record(start.elapsed().as_secs_f64());
        for allocation in &stored {
            tracing::info!(
                target: "audit",
                allocation_id = %allocation.id,
                transaction_id = %transaction_id,
                recipient_id = %allocation.recipient_id,
                money = %allocation.money,
                snapshot_id = %allocation.config_snapshot_id,
                "Allocation created"
            );
        }

        Ok(stored)
    }

    fn allocate_pending(&mut self) -> Vec<Allocation> {
        let mut allocated = Vec::new();
        for id in self.pending_ids() {
            match self.allocate_one(id) {
                Ok(mut allocations) => allocated.append(&mut allocations),
                Err(e) => {
                    tracing::warn!(transaction_id = %id, error = %e, "Pending allocation failed");
                }
            }
        }
        allocated
    }

    fn pending_ids(&self) -> Vec<Uuid> {
        self.pending.iter().map(|(_, id)| *id).collect()
    }

    fn report_pending(&self) {
        gauge!("pending_allocations").set(self.pending.len() as f64);
    }
}

fn log_transition_error(e: LedgerError) -> LedgerError {
    if let LedgerError::InvalidTransition { id, from, to } = &e {
        tracing::warn!(
            transaction_id = %id,
            from = %from,
            to = %to,
            "Rejected transition out of terminal state"
        );
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Money};
    use rust_decimal::Decimal;

    fn usdc(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), Currency::Usdc, "BSC").unwrap()
    }

    async fn default_split(ledger: &SplitLedger) {
        ledger.add_recipient("Platform Fee", 15, "0x1a2b").await.unwrap();
        ledger.add_recipient("Partner Commission", 25, "0x5e6f").await.unwrap();
        ledger.add_recipient("Merchant Revenue", 60, "0x9i0j").await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_auto_allocates() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        default_split(&ledger).await;

        let tx = ledger
            .record(NewTransaction::incoming(usdc(10000), "0xaaa"))
            .await
            .unwrap();
        let confirmation = ledger.confirm(tx.id).await.unwrap();

        assert_eq!(confirmation.allocations.len(), 3);
        assert!(confirmation.allocation_error.is_none());
        assert!(matches!(
            ledger.allocate(tx.id).await,
            Err(LedgerError::AlreadyAllocated(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_split_defers_until_fixed() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        ledger.add_recipient("Platform Fee", 15, "0x1a2b").await.unwrap();

        let tx = ledger
            .record(NewTransaction::incoming(usdc(10000), "0xbbb"))
            .await
            .unwrap();
        let confirmation = ledger.confirm(tx.id).await.unwrap();
        assert!(confirmation.allocations.is_empty());
        assert!(confirmation.allocation_error.is_some());
        assert_eq!(ledger.pending_allocation_count().await, 1);

        let change = ledger.add_recipient("Merchant Revenue", 85, "0x9i0j").await.unwrap();
        assert!(change.split.is_valid);
        assert_eq!(change.allocated.len(), 2);
        assert_eq!(ledger.pending_allocation_count().await, 0);
    }

    #[tokio::test]
    async fn test_manual_allocation_when_auto_disabled() {
        let ledger = SplitLedger::new(LedgerOptions {
            auto_allocate: false,
            ..Default::default()
        });
        default_split(&ledger).await;

        let tx = ledger
            .record(NewTransaction::incoming(usdc(5000), "0xccc"))
            .await
            .unwrap();
        assert!(matches!(
            ledger.allocate(tx.id).await,
            Err(LedgerError::AllocationRejected { .. })
        ));

        let confirmation = ledger.confirm(tx.id).await.unwrap();
        assert!(confirmation.allocations.is_empty());

        let allocations = ledger.allocate(tx.id).await.unwrap();
        assert_eq!(allocations.len(), 3);
        assert_eq!(ledger.allocations_for(tx.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_allocate_has_single_winner() {
        let ledger = SplitLedger::new(LedgerOptions {
            auto_allocate: false,
            ..Default::default()
        });
        default_split(&ledger).await;
        let tx = ledger
            .record(NewTransaction::incoming(usdc(10000), "0xddd"))
            .await
            .unwrap();
        ledger.confirm(tx.id).await.unwrap();
        let id = tx.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.allocate(id).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert!(matches!(e, LedgerError::AlreadyAllocated(_))),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(ledger.allocations_for(tx.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        let mut rx = ledger.subscribe();

        ledger
            .record(NewTransaction::incoming(usdc(100), "0xeee"))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            LedgerEvent::TransactionRecorded(tx) => assert_eq!(tx.hash, "0xeee"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pending_transactions_allocate_oldest_first() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        ledger.add_recipient("Platform Fee", 15, "0x1a2b").await.unwrap();

        let earlier = Utc::now() - chrono::Duration::minutes(5);
        let older = ledger
            .record(NewTransaction {
                created_at: Some(earlier),
                ..NewTransaction::incoming(usdc(1000), "0xolder")
            })
            .await
            .unwrap();
        let newer = ledger
            .record(NewTransaction::incoming(usdc(2000), "0xnewer"))
            .await
            .unwrap();

        // Confirmation order differs from creation order
        ledger.confirm(newer.id).await.unwrap();
        ledger.confirm(older.id).await.unwrap();
        assert_eq!(ledger.pending_allocation_count().await, 2);

        let change = ledger.add_recipient("Merchant Revenue", 85, "0x9i0j").await.unwrap();
        assert_eq!(change.allocated.len(), 4);
        assert_eq!(change.allocated[0].transaction_id, older.id);
        assert_eq!(change.allocated[2].transaction_id, newer.id);
        assert_eq!(ledger.pending_allocation_count().await, 0);
    }

    #[tokio::test]
    async fn test_manual_allocate_clears_pending() {
        let ledger = SplitLedger::new(LedgerOptions {
            auto_allocate: false,
            ..Default::default()
        });
        default_split(&ledger).await;

        let tx = ledger
            .record(NewTransaction::incoming(usdc(3000), "0xmanual"))
            .await
            .unwrap();
        assert_eq!(ledger.pending_allocation_count().await, 0);
        ledger.confirm(tx.id).await.unwrap();
        assert_eq!(ledger.pending_allocation_count().await, 1);

        ledger.allocate(tx.id).await.unwrap();
        assert_eq!(ledger.pending_allocation_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_split_events_arrive_in_commit_order() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        let mut rx = ledger.subscribe();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger.add_recipient(&format!("R{i}"), 1, "0xaddr").await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut revisions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let LedgerEvent::SplitUpdated(summary) = event {
                revisions.push(summary.revision);
            }
        }
        assert_eq!(revisions, (1..=16).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_transaction_filter() {
        let ledger = SplitLedger::new(LedgerOptions::default());
        let incoming = ledger
            .record(NewTransaction::incoming(usdc(100), "0x111"))
            .await
            .unwrap();
        ledger
            .record(NewTransaction::outgoing(usdc(200), "0x222"))
            .await
            .unwrap();
        ledger.fail(incoming.id).await.unwrap();

        let failed = ledger
            .transactions(&TransactionFilter {
                status: Some(TransactionStatus::Failed),
                ..Default::default()
            })
            .await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, incoming.id);

        let outgoing = ledger
            .transactions(&TransactionFilter {
                direction: Some(Direction::Outgoing),
                ..Default::default()
            })
            .await;
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].hash, "0x222");
    }
}
