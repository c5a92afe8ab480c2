pub mod chain;
pub mod dashboard;
pub mod ops;
pub mod split;
pub mod transactions;
pub mod withdrawals;
pub mod ws;

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Wrap a successful payload in the standard envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}
