pub mod api;
pub mod config;
pub mod errors;
pub mod ingestion;
pub mod ledger;
pub mod metrics;
pub mod models;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::ingestion::ChainEvent;
use crate::ledger::SplitLedger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: SplitLedger,
    pub config: AppConfig,
    pub ingest_tx: mpsc::Sender<ChainEvent>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

/// Recipients the dashboard ships with: 15% platform fee, 25% partner
/// commission, 60% merchant revenue.
pub async fn seed_default_split(ledger: &SplitLedger) -> Result<(), ledger::LedgerError> {
    ledger.add_recipient("Platform Fee", 15, "0x1a2b...3c4d").await?;
    ledger
        .add_recipient("Partner Commission", 25, "0x5e6f...7g8h")
        .await?;
    ledger
        .add_recipient("Merchant Revenue", 60, "0x9i0j...1k2l")
        .await?;
    Ok(())
}
