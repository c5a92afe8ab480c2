use tokio::sync::mpsc;

use paysplit::api::router::create_router;
use paysplit::config::AppConfig;
use paysplit::ingestion::{run_ingestion, ChainEvent};
use paysplit::ledger::SplitLedger;
use paysplit::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = paysplit::metrics::init_metrics();

    let ledger = SplitLedger::new(config.ledger_options());
    if config.seed_default_split {
        paysplit::seed_default_split(&ledger).await?;
        tracing::info!("Seeded default split configuration");
    }

    // --- Chain ingestion: listener webhook → ledger ---
    let (ingest_tx, ingest_rx) = mpsc::channel::<ChainEvent>(config.ingest_buffer.max(1));
    let ingest_ledger = ledger.clone();
    tokio::spawn(async move {
        run_ingestion(ingest_rx, ingest_ledger).await;
    });

    tracing::info!(
        auto_allocate = config.auto_allocate,
        api_auth = config.has_api_auth(),
        "Split ledger ready"
    );

    let state = AppState {
        ledger,
        config,
        ingest_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping...");
}
