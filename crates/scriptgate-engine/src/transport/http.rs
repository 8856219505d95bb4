//! Authorization endpoint.
//!
//! `POST /v1/evaluators/{id}/authorize` takes the request wire document and
//! answers with the decision document. Evaluation failures are already folded
//! into `DENY` by the evaluator, so the only error responses here concern
//! routing (unknown evaluator) or an unparsable request body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use scriptgate_core::protocol::AuthorizationRequest;

use crate::app_state::AppState;

fn error_json(code: &str, msg: &str) -> serde_json::Value {
    json!({ "error": code, "msg": msg })
}

pub async fn authorize(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AuthorizationRequest>,
) -> Response {
    let Some(evaluator) = app.evaluator(&id) else {
        tracing::debug!(evaluator = %id, "authorize for unknown evaluator");
        return (
            StatusCode::NOT_FOUND,
            Json(error_json("NOT_FOUND", "unknown evaluator")),
        )
            .into_response();
    };

    let decision = evaluator.evaluate(&req).await;
    (StatusCode::OK, Json(decision)).into_response()
}
