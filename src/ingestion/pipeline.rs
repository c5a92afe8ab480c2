use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ledger::{LedgerError, SplitLedger};
use crate::models::{NewTransaction, TransactionStatus};

/// Notification from an external chain or payment-network listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainEvent {
    /// A transfer was seen on-chain for the first time.
    Observed(NewTransaction),
    Processing { hash: String },
    Confirmed { hash: String },
    Failed { hash: String },
}

impl ChainEvent {
    pub fn hash(&self) -> &str {
        match self {
            ChainEvent::Observed(new) => &new.hash,
            ChainEvent::Processing { hash }
            | ChainEvent::Confirmed { hash }
            | ChainEvent::Failed { hash } => hash,
        }
    }
}

/// Apply one chain event to the ledger.
///
/// Replays are no-ops: a hash seen twice, or a status the transaction has
/// already reached, returns `Ok(())`. Only genuine conflicts (confirming a
/// failed transfer, or the reverse) and unknown hashes are errors.
pub async fn process_chain_event(
    event: &ChainEvent,
    ledger: &SplitLedger,
) -> Result<(), LedgerError> {
    let new = match event {
        ChainEvent::Observed(new) => new,
        ChainEvent::Processing { hash } => {
            return apply_status(ledger, hash, TransactionStatus::Processing).await;
        }
        ChainEvent::Confirmed { hash } => {
            return apply_status(ledger, hash, TransactionStatus::Confirmed).await;
        }
        ChainEvent::Failed { hash } => {
            return apply_status(ledger, hash, TransactionStatus::Failed).await;
        }
    };

    match ledger.record(new.clone()).await {
        Ok(tx) => {
            tracing::debug!(transaction_id = %tx.id, hash = %tx.hash, "Chain transfer recorded");
            Ok(())
        }
        Err(LedgerError::DuplicateHash(hash)) => {
            tracing::debug!(hash = %hash, "Chain transfer already recorded, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn apply_status(
    ledger: &SplitLedger,
    hash: &str,
    target: TransactionStatus,
) -> Result<(), LedgerError> {
    let tx = ledger
        .transaction_by_hash(hash)
        .await
        .ok_or_else(|| LedgerError::not_found("transaction hash", hash))?;

    // Already there, or past it (processing after confirmation)
    if tx.status == target
        || (target == TransactionStatus::Processing && tx.status.is_terminal())
    {
        tracing::debug!(
            hash = %hash,
            status = %tx.status,
            "Chain status already applied, skipping"
        );
        return Ok(());
    }

    match target {
        TransactionStatus::Processing => ledger.mark_processing(tx.id).await.map(|_| ()),
        TransactionStatus::Confirmed => {
            let confirmation = ledger.confirm(tx.id).await?;
            if let Some(reason) = confirmation.allocation_error {
                tracing::warn!(
                    hash = %hash,
                    reason = %reason,
                    "Confirmed transfer awaiting allocation"
                );
            }
            Ok(())
        }
        TransactionStatus::Failed => ledger.fail(tx.id).await.map(|_| ()),
        TransactionStatus::Pending => Ok(()),
    }
}

/// Consume chain events until every sender is dropped.
pub async fn run_ingestion(mut rx: mpsc::Receiver<ChainEvent>, ledger: SplitLedger) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = process_chain_event(&event, &ledger).await {
            tracing::error!(
                error = %e,
                hash = %event.hash(),
                "Chain event processing failed"
            );
        }
    }
    tracing::warn!("ChainEvent channel closed");
}
