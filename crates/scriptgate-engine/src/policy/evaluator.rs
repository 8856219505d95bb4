use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, info_span, warn, Instrument};

use scriptgate_core::error::{Result, ScriptGateError};
use scriptgate_core::protocol::{
    decode_decision, encode_request, AuthorizationRequest, Decision, DecisionStatus,
};

use crate::config::EvaluatorConfig;
use crate::invoke::{Invocation, PolicyProcess, ScriptProcess};
use crate::obs::{ActiveProcessGuard, EngineMetrics};
use crate::pool::ProcessPool;

/// Evaluates authorization requests against one external decision process.
/// Construct once at startup, then share via Arc.
pub struct ScriptEvaluator {
    id: String,
    process: Arc<dyn PolicyProcess>,
    pool: ProcessPool,
    metrics: Option<Arc<EngineMetrics>>,
}

impl ScriptEvaluator {
    pub fn new(id: impl Into<String>, process: Arc<dyn PolicyProcess>, pool: ProcessPool) -> Self {
        Self {
            id: id.into(),
            process,
            pool,
            metrics: None,
        }
    }

    /// Evaluator backed by the configured command, with its own pool.
    pub fn from_config(cfg: &EvaluatorConfig) -> Result<Self> {
        cfg.validate()?;
        let process = ScriptProcess::from_config(cfg)?;
        let pool = ProcessPool::new(cfg.max_concurrent_processes, cfg.queue_timeout());
        Ok(Self::new(cfg.id.clone(), Arc::new(process), pool))
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pool(&self) -> &ProcessPool {
        &self.pool
    }

    /// Evaluate one request. Never fails: any error, or a panic in the
    /// process layer, becomes `DENY`.
    pub async fn evaluate(&self, req: &AuthorizationRequest) -> Decision {
        let span = info_span!("evaluate", evaluator = %self.id, client_id = %req.client_id());
        async {
            let outcome = AssertUnwindSafe(self.try_evaluate(req))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ScriptGateError::Internal(format!(
                        "evaluation panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
            let decision = match outcome {
                Ok(d) => {
                    debug!(status = d.status().as_str(), claims = d.claims().len(), "decision");
                    d
                }
                Err(e) => {
                    let kind = e.kind().as_str();
                    warn!(kind, error = %e, "evaluation failed, denying");
                    if let Some(m) = &self.metrics {
                        m.evaluation_errors.inc(&[("evaluator", self.id.as_str()), ("kind", kind)]);
                    }
                    Decision::deny()
                }
            };
            if let Some(m) = &self.metrics {
                m.evaluations.inc(&[
                    ("evaluator", self.id.as_str()),
                    ("status", decision.status().as_str()),
                ]);
            }
            decision
        }
        .instrument(span)
        .await
    }

    /// Same pipeline as `evaluate`, but surfaces the failure instead of denying.
    pub async fn try_evaluate(&self, req: &AuthorizationRequest) -> Result<Decision> {
        let input = encode_request(req)?;

        let _slot = self.pool.acquire().await?;
        let _active = self
            .metrics
            .as_ref()
            .map(|m| ActiveProcessGuard::new(Arc::clone(m), &self.id));

        let invocation = self.process.run(input).await?;
        if let Some(m) = &self.metrics {
            m.process_duration
                .observe(&[("evaluator", self.id.as_str())], invocation.elapsed);
        }

        interpret(&invocation, self.process.describe())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string payload"
    }
}

/// Turn a finished run into a decision, or the reason it has none.
fn interpret(inv: &Invocation, process: &str) -> Result<Decision> {
    if inv.output_truncated {
        warn!(process, exit_code = ?inv.exit_code, stderr = %inv.stderr, "decision output exceeded ceiling");
        return Err(ScriptGateError::OutputTooLarge {
            limit: inv.output_limit,
        });
    }

    let decoded = decode_decision(&inv.stdout);

    if inv.process_failed() {
        return match decoded {
            Ok(d) => {
                warn!(
                    process,
                    exit_code = ?inv.exit_code,
                    stderr = %inv.stderr,
                    "decision process exited non-zero but produced a decision"
                );
                Ok(Decision::from(d))
            }
            Err(e) => {
                warn!(process, exit_code = ?inv.exit_code, stderr = %inv.stderr, "decision process failed");
                Err(ScriptGateError::ProcessExit {
                    code: inv.exit_code,
                    detail: e.to_string(),
                })
            }
        };
    }

    let d = decoded.map_err(|e| {
        warn!(process, stderr = %inv.stderr, error = %e, "undecodable decision output");
        e
    })?;
    if d.status == DecisionStatus::Deny && !d.claims.is_empty() {
        debug!(dropped = d.claims.len(), "claims on DENY discarded");
    }
    Ok(Decision::from(d))
}
