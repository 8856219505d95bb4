//! End-to-end evaluator tests against real child processes.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use scriptgate_core::error::{ErrorKind, ScriptGateError};
use scriptgate_core::protocol::{AuthorizationRequest, Claim, Decision};
use scriptgate_engine::ScriptEvaluator;

use common::{config_for, evaluator_for, script_command};

fn expected_proceed() -> Decision {
    Decision::proceed(vec![
        Claim::new("example_claim1", ["authorized"]),
        Claim::new("organization", ["org1", "org2"]),
    ])
}

#[tokio::test]
async fn deny_by_role() {
    let ev = evaluator_for("example_policy.sh");
    let req = AuthorizationRequest::new("client1").with_attribute("role", ["spy"]);
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn deny_by_identity() {
    let ev = evaluator_for("example_policy.sh");
    let req = AuthorizationRequest::new("client1").with_identity("x", "evil-user");
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn deny_by_client() {
    let ev = evaluator_for("example_policy.sh");
    let req = AuthorizationRequest::new("evil-client");
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn proceed_when_nothing_matches() {
    let ev = evaluator_for("example_policy.sh");
    let req = AuthorizationRequest::new("client1")
        .with_attribute("role", ["user"])
        .with_identity("userName", "alice");
    assert_eq!(ev.evaluate(&req).await, expected_proceed());
}

#[tokio::test]
async fn repeated_evaluation_is_stable() {
    let ev = evaluator_for("example_policy.sh");
    let req = AuthorizationRequest::new("client1").with_attribute("role", ["user"]);
    let first = ev.evaluate(&req).await;
    let second = ev.evaluate(&req).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn echo_round_trip_preserves_request() {
    let ev = evaluator_for("echo.sh");
    let req = AuthorizationRequest::new("client1")
        .with_attribute("role", ["user", "admin"])
        .with_attribute("email", ["alice@example.org"])
        .with_identity("userName", "alice")
        .with_identity("x500Name", "CN=Alice,O=Example")
        .with_param("scope", "openid profile");

    let decision = ev.try_evaluate(&req).await.unwrap();
    assert!(decision.is_proceed());
    let echoed = &decision.claims()[0];
    assert_eq!(echoed.name, "echo");
    let back: AuthorizationRequest = serde_json::from_value(echoed.values[0].clone()).unwrap();
    assert_eq!(back, req);
}

#[tokio::test]
async fn deny_claims_are_stripped() {
    let ev = evaluator_for("deny_with_claims.sh");
    let d = ev.evaluate(&AuthorizationRequest::new("c")).await;
    assert_eq!(d, Decision::deny());
    assert!(d.claims().is_empty());
}

#[tokio::test]
async fn oversized_output_denies() {
    let ev = evaluator_for("oversized.sh");
    let req = AuthorizationRequest::new("c");

    let err = ev.try_evaluate(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputTooLarge);
    assert!(matches!(err, ScriptGateError::OutputTooLarge { limit: 1_048_576 }));
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn oversized_output_fits_a_larger_ceiling() {
    let mut cfg = config_for("oversized.sh");
    cfg.max_output_bytes = 2 * 1024 * 1024;
    let ev = ScriptEvaluator::from_config(&cfg).unwrap();
    let d = ev.evaluate(&AuthorizationRequest::new("c")).await;
    assert!(d.is_proceed());
    assert_eq!(d.claims()[0].values[0].as_str().map(str::len), Some(1_100_000));
}

#[tokio::test]
async fn non_zero_exit_without_output_denies() {
    let ev = evaluator_for("exit_nonzero.sh");
    let req = AuthorizationRequest::new("c");

    let err = ev.try_evaluate(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessExit);
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn non_zero_exit_with_decision_is_honoured() {
    let ev = evaluator_for("exit_nonzero_with_decision.sh");
    let d = ev.evaluate(&AuthorizationRequest::new("c")).await;
    assert_eq!(d, Decision::proceed(vec![Claim::new("example_claim1", ["authorized"])]));
}

#[tokio::test]
async fn malformed_output_denies() {
    let ev = evaluator_for("malformed.sh");
    let err = ev.try_evaluate(&AuthorizationRequest::new("c")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn mixed_case_status_denies() {
    let ev = evaluator_for("mixed_case.sh");
    let req = AuthorizationRequest::new("c");
    assert_eq!(ev.try_evaluate(&req).await.unwrap_err().kind(), ErrorKind::Decode);
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn legacy_claims_are_normalized() {
    let ev = evaluator_for("legacy_claims.sh");
    let d = ev.evaluate(&AuthorizationRequest::new("c")).await;
    assert_eq!(d, Decision::proceed(vec![Claim::new("example_claim1", ["authorized"])]));
}

#[tokio::test]
async fn missing_executable_denies() {
    let cfg = scriptgate_engine::config::EvaluatorConfig::new(
        "missing",
        vec!["/nonexistent/scriptgate-policy".to_string()],
    );
    let ev = ScriptEvaluator::from_config(&cfg).unwrap();
    let req = AuthorizationRequest::new("c");
    assert_eq!(ev.try_evaluate(&req).await.unwrap_err().kind(), ErrorKind::Spawn);
    assert_eq!(ev.evaluate(&req).await, Decision::deny());
}

#[tokio::test]
async fn child_that_ignores_stdin_still_decides() {
    let ev = evaluator_for("no_read.sh");
    // Larger than a pipe buffer, so the write hits a closed pipe.
    let big = "v".repeat(512 * 1024);
    let req = AuthorizationRequest::new("c").with_attribute("blob", [big]);
    assert!(ev.evaluate(&req).await.is_proceed());
}

#[tokio::test]
async fn chatty_stderr_does_not_block() {
    let ev = evaluator_for("stderr_noise.sh");
    assert!(ev.evaluate(&AuthorizationRequest::new("c")).await.is_proceed());
}

#[tokio::test]
async fn environment_is_controlled() {
    let mut cfg = config_for("env_check.sh");
    cfg.env.insert("POLICY_MODE".into(), "strict".into());
    let ev = ScriptEvaluator::from_config(&cfg).unwrap();
    assert!(ev.evaluate(&AuthorizationRequest::new("c")).await.is_proceed());
}

#[tokio::test]
async fn requests_run_in_parallel_up_to_the_limit() {
    let mut cfg = config_for("slow.sh");
    cfg.max_concurrent_processes = 4;
    let ev = Arc::new(ScriptEvaluator::from_config(&cfg).unwrap());

    let mut handles = Vec::new();
    for i in 0..4 {
        let ev = Arc::clone(&ev);
        handles.push(tokio::spawn(async move {
            ev.evaluate(&AuthorizationRequest::new(format!("client{i}"))).await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().is_proceed());
    }
    assert_eq!(ev.pool().available(), 4);
}

#[tokio::test]
async fn saturated_pool_denies() {
    let mut cfg = config_for("slow.sh");
    cfg.max_concurrent_processes = 1;
    cfg.queue_timeout_ms = 50;
    let ev = Arc::new(ScriptEvaluator::from_config(&cfg).unwrap());

    let a = {
        let ev = Arc::clone(&ev);
        tokio::spawn(async move { ev.evaluate(&AuthorizationRequest::new("a")).await })
    };
    let b = {
        let ev = Arc::clone(&ev);
        tokio::spawn(async move { ev.evaluate(&AuthorizationRequest::new("b")).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|d| d.is_proceed()).count(), 1);
    assert!(results.contains(&Decision::deny()));
}

#[tokio::test]
async fn pools_are_per_evaluator() {
    let mut cfg = config_for("slow.sh");
    cfg.max_concurrent_processes = 1;
    cfg.queue_timeout_ms = 50;
    let busy = Arc::new(ScriptEvaluator::from_config(&cfg).unwrap());
    let other = ScriptEvaluator::from_config(&cfg).unwrap();

    let held = {
        let busy = Arc::clone(&busy);
        tokio::spawn(async move { busy.evaluate(&AuthorizationRequest::new("a")).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(other.evaluate(&AuthorizationRequest::new("b")).await.is_proceed());
    assert!(held.await.unwrap().is_proceed());
}

#[test]
fn command_helper_builds_sh_invocation() {
    let cmd = script_command("echo.sh", &["x"]);
    assert_eq!(cmd[0], "sh");
    assert!(cmd[1].ends_with("tests/scripts/echo.sh"));
    assert_eq!(cmd[2], "x");
}
