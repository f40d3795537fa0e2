use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use super::SharedNavigator;
use crate::models::Answer;
use crate::navigation::{NavigationError, SessionView};

// ============================================================
// Error Handling
// ============================================================

/// Refused transitions are reported to the client as-is; storage failures
/// are logged and returned as a generic message.
fn navigation_error(e: NavigationError) -> (StatusCode, String) {
    if e.is_data_error() {
        return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }

    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Session
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerInput {
    pub choice: Answer,
}

pub async fn get_state(State(navigator): State<SharedNavigator>) -> Json<SessionView> {
    let navigator = navigator.lock().expect("navigator lock poisoned");
    Json(navigator.view())
}

pub async fn answer(
    State(navigator): State<SharedNavigator>,
    Json(input): Json<AnswerInput>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut navigator = navigator.lock().expect("navigator lock poisoned");
    navigator.answer(input.choice).map_err(navigation_error)?;
    Ok(Json(navigator.view()))
}

pub async fn go_back(
    State(navigator): State<SharedNavigator>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut navigator = navigator.lock().expect("navigator lock poisoned");
    navigator.go_back().map_err(navigation_error)?;
    Ok(Json(navigator.view()))
}

pub async fn restart(
    State(navigator): State<SharedNavigator>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut navigator = navigator.lock().expect("navigator lock poisoned");
    navigator.restart().map_err(navigation_error)?;
    Ok(Json(navigator.view()))
}
