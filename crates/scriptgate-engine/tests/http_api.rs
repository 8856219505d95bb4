//! HTTP surface tests (handlers called directly).

#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::body::to_bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use scriptgate_core::protocol::AuthorizationRequest;
use scriptgate_engine::app_state::AppState;
use scriptgate_engine::config::{EngineConfig, ServerSection};
use scriptgate_engine::{ops, transport};

use common::config_for;

fn state() -> AppState {
    let cfg = EngineConfig {
        version: 1,
        server: ServerSection::default(),
        evaluators: vec![config_for("example_policy.sh")],
    };
    AppState::new(cfg).unwrap()
}

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn authorize_returns_decision_document() {
    let app = state();
    let req = AuthorizationRequest::new("client1");
    let resp = transport::http::authorize(
        State(app.clone()),
        Path("example_policy.sh".to_string()),
        Json(req),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["status"], "PROCEED");
    assert_eq!(v["claims"][1]["values"], serde_json::json!(["org1", "org2"]));
}

#[tokio::test]
async fn authorize_deny_has_empty_claims() {
    let app = state();
    let req = AuthorizationRequest::new("evil-client");
    let resp = transport::http::authorize(
        State(app),
        Path("example_policy.sh".to_string()),
        Json(req),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!({"status": "DENY", "claims": []}));
}

#[tokio::test]
async fn unknown_evaluator_is_not_found() {
    let resp = transport::http::authorize(
        State(state()),
        Path("nope".to_string()),
        Json(AuthorizationRequest::new("c")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "NOT_FOUND");
}

#[tokio::test]
async fn readiness_follows_draining() {
    let app = state();
    let resp = ops::readyz(State(app.clone())).await.into_response();
    assert_eq!(resp.status(), StatusCode::OK);

    app.set_draining();
    let resp = ops::readyz(State(app)).await.into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_reflect_evaluations() {
    let app = state();
    let _ = transport::http::authorize(
        State(app.clone()),
        Path("example_policy.sh".to_string()),
        Json(AuthorizationRequest::new("evil-client")),
    )
    .await;

    let resp = ops::metrics(State(app)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains(
        "scriptgate_evaluations_total{evaluator=\"example_policy.sh\",status=\"DENY\"} 1"
    ));
    assert!(text.contains("scriptgate_pool_available{evaluator=\"example_policy.sh\"} 8"));
}

#[test]
fn router_builds() {
    let _ = scriptgate_engine::router::build_router(state());
}
