mod common;

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use paysplit::ingestion::{process_chain_event, run_ingestion, ChainEvent};
use paysplit::ledger::{LedgerError, LedgerOptions};
use paysplit::models::TransactionStatus;

use common::{incoming, seeded_ledger};

fn confirmed(hash: &str) -> ChainEvent {
    ChainEvent::Confirmed { hash: hash.into() }
}

#[tokio::test]
async fn test_observed_then_confirmed_allocates() {
    let ledger = seeded_ledger(LedgerOptions::default()).await;

    process_chain_event(&ChainEvent::Observed(incoming("150.00", "0xchain1")), &ledger)
        .await
        .unwrap();
    process_chain_event(&ChainEvent::Processing { hash: "0xchain1".into() }, &ledger)
        .await
        .unwrap();
    process_chain_event(&confirmed("0xchain1"), &ledger).await.unwrap();

    let tx = ledger.transaction_by_hash("0xchain1").await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Confirmed);
    let allocations = ledger.allocations_for(tx.id).await.unwrap();
    assert_eq!(allocations.len(), 3);
    let total: Decimal = allocations.iter().map(|a| a.money.amount).sum();
    assert_eq!(total, tx.money.amount);
}

#[tokio::test]
async fn test_replayed_events_are_noops() {
    let ledger = seeded_ledger(LedgerOptions::default()).await;
    let observed = ChainEvent::Observed(incoming("10.00", "0xreplay"));

    process_chain_event(&observed, &ledger).await.unwrap();
    process_chain_event(&observed, &ledger).await.unwrap();
    process_chain_event(&confirmed("0xreplay"), &ledger).await.unwrap();
    process_chain_event(&confirmed("0xreplay"), &ledger).await.unwrap();
    // Late processing notice after confirmation
    process_chain_event(&ChainEvent::Processing { hash: "0xreplay".into() }, &ledger)
        .await
        .unwrap();

    let all = ledger.transactions(&Default::default()).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, TransactionStatus::Confirmed);
    assert_eq!(ledger.allocations_for(all[0].id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_conflicting_terminal_status_is_error() {
    let ledger = seeded_ledger(LedgerOptions::default()).await;

    process_chain_event(&ChainEvent::Observed(incoming("10.00", "0xconflict")), &ledger)
        .await
        .unwrap();
    process_chain_event(&ChainEvent::Failed { hash: "0xconflict".into() }, &ledger)
        .await
        .unwrap();

    let err = process_chain_event(&confirmed("0xconflict"), &ledger)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_unknown_hash_is_not_found() {
    let ledger = seeded_ledger(LedgerOptions::default()).await;

    let err = process_chain_event(&confirmed("0xnever_seen"), &ledger)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_chain_event_wire_format() {
    let json = serde_json::json!({
        "kind": "observed",
        "direction": "incoming",
        "money": { "amount": "12.34", "currency": "USDT", "network": "TRON" },
        "hash": "0xwire",
    });

    let event: ChainEvent = serde_json::from_value(json).unwrap();
    match &event {
        ChainEvent::Observed(new) => {
            assert_eq!(new.money.amount, Decimal::new(1234, 2));
            assert!(new.status.is_none());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(event.hash(), "0xwire");
}

#[tokio::test]
async fn test_run_ingestion_drains_channel() {
    let ledger = seeded_ledger(LedgerOptions::default()).await;
    let (tx, rx) = mpsc::channel(16);
    let worker = tokio::spawn(run_ingestion(rx, ledger.clone()));

    tx.send(ChainEvent::Observed(incoming("20.00", "0xworker"))).await.unwrap();
    // An error mid-stream does not stop the consumer
    tx.send(confirmed("0xmissing")).await.unwrap();
    tx.send(confirmed("0xworker")).await.unwrap();
    drop(tx);
    worker.await.unwrap();

    let tx = ledger.transaction_by_hash("0xworker").await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Confirmed);
    assert_eq!(ledger.pending_allocation_count().await, 0);
}
