use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tower::ServiceExt;

use paysplit::api::router::create_router;
use paysplit::config::AppConfig;
use paysplit::ingestion::ChainEvent;
use paysplit::ledger::{LedgerOptions, SplitLedger};
use paysplit::models::{Currency, Money, NewTransaction};
use paysplit::AppState;

/// Build the full router over a fresh in-memory ledger.
///
/// The ingestion receiver is returned so tests can keep the pipeline "open"
/// (health reports 503 once it is dropped) or drive it by hand.
#[allow(dead_code)]
pub fn build_test_app(config: AppConfig) -> (Router, SplitLedger, mpsc::Receiver<ChainEvent>) {
    let ledger = SplitLedger::new(config.ledger_options());
    let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest_buffer.max(1));
    let metrics_handle = paysplit::metrics::init_metrics();

    let state = AppState {
        ledger: ledger.clone(),
        config,
        ingest_tx,
        metrics_handle,
    };

    (create_router(state), ledger, ingest_rx)
}

/// Ledger with the dashboard's default 15/25/60 split.
#[allow(dead_code)]
pub async fn seeded_ledger(options: LedgerOptions) -> SplitLedger {
    let ledger = SplitLedger::new(options);
    paysplit::seed_default_split(&ledger)
        .await
        .expect("Failed to seed default split");
    ledger
}

#[allow(dead_code)]
pub fn usdc(amount: &str) -> Money {
    Money::new(amount.parse::<Decimal>().unwrap(), Currency::Usdc, "BSC").unwrap()
}

#[allow(dead_code)]
pub fn incoming(amount: &str, hash: &str) -> NewTransaction {
    NewTransaction::incoming(usdc(amount), hash)
}

/// Fire one request at the router and decode the JSON body.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    decode(resp).await
}

#[allow(dead_code)]
pub async fn decode(resp: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
