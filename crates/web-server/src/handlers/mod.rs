use crate::{AppState, Readiness};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub mod entities;
pub mod groups;
pub mod memberships;

pub use entities::{create, delete, find, list, rename, Resource};

/// Request body for create and rename.
#[derive(Debug, Deserialize)]
pub struct NamePayload {
    pub name: Option<String>,
}

/// Body of every successful write.
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: &'static str,
}

pub(crate) fn success(status: StatusCode, message: &'static str) -> (StatusCode, Json<Success>) {
    (status, Json(Success { success: message }))
}

/// # GET /api/health
/// 200 once the database is reachable and the schema exists, 503 before that
/// or if the bootstrap failed.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = *state.readiness.borrow();
    let status = match readiness {
        Readiness::Ready => StatusCode::OK,
        Readiness::Starting | Readiness::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "status": readiness })))
}
