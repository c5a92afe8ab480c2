use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::ops::health_check))
        .route("/metrics", get(handlers::ops::render_metrics));

    // Protected API routes — require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Dashboard
        .route("/api/dashboard/summary", get(handlers::dashboard::summary))
        // Transactions
        .route(
            "/api/transactions",
            get(handlers::transactions::list).post(handlers::transactions::record),
        )
        .route("/api/transactions/:id", get(handlers::transactions::detail))
        .route("/api/transactions/:id/processing", post(handlers::transactions::processing))
        .route("/api/transactions/:id/confirm", post(handlers::transactions::confirm))
        .route("/api/transactions/:id/fail", post(handlers::transactions::fail))
        .route("/api/transactions/:id/allocate", post(handlers::transactions::allocate))
        .route("/api/transactions/:id/allocations", get(handlers::transactions::allocations))
        .route("/api/allocations/retry", post(handlers::transactions::retry_pending))
        // Split configuration
        .route("/api/split", get(handlers::split::get_split))
        .route("/api/split/recipients", post(handlers::split::add_recipient))
        .route(
            "/api/split/recipients/:id",
            put(handlers::split::update_recipient).delete(handlers::split::remove_recipient),
        )
        .route("/api/split/snapshots/:id", get(handlers::split::snapshot))
        // Withdrawals
        .route("/api/withdrawals", get(handlers::withdrawals::history))
        .route("/api/withdrawals/balances", get(handlers::withdrawals::balances))
        .route("/api/recipients/:id/withdrawable", get(handlers::withdrawals::withdrawable))
        .route("/api/recipients/:id/withdraw", post(handlers::withdrawals::withdraw))
        // Chain listener webhook
        .route("/api/chain/events", post(handlers::chain::enqueue))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // CORS: the dashboard is served from another origin; API access needs the token
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
