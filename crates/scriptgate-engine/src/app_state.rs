//! Shared application state for the scriptgate engine.
//!
//! Built once from config: one `ScriptEvaluator` (with its own process pool)
//! per configured evaluator, plus the metrics registry.

use std::collections::HashMap;
use std::sync::Arc;

use scriptgate_core::error::{Result, ScriptGateError};

use crate::config::EngineConfig;
use crate::obs::EngineMetrics;
use crate::policy::ScriptEvaluator;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<EngineMetrics>,
}

struct AppStateInner {
    evaluators: HashMap<String, Arc<ScriptEvaluator>>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: EngineConfig) -> Result<Self> {
        let metrics = Arc::new(EngineMetrics::default());

        let mut evaluators = HashMap::new();
        for ev_cfg in &cfg.evaluators {
            let evaluator = ScriptEvaluator::from_config(ev_cfg)
                .map_err(|e| {
                    ScriptGateError::Config(format!(
                        "evaluator setup failed (evaluator={}): {e}",
                        ev_cfg.id
                    ))
                })?
                .with_metrics(Arc::clone(&metrics));

            tracing::info!(
                evaluator = %ev_cfg.id,
                command = %ev_cfg.command.join(" "),
                timeout_ms = ev_cfg.timeout_ms,
                max_output_bytes = ev_cfg.max_output_bytes,
                max_concurrent_processes = ev_cfg.max_concurrent_processes,
                "evaluator registered"
            );
            evaluators.insert(ev_cfg.id.clone(), Arc::new(evaluator));
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { evaluators }),
            metrics,
        })
    }

    pub fn evaluator(&self, id: &str) -> Option<Arc<ScriptEvaluator>> {
        self.inner.evaluators.get(id).cloned()
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Pool occupancy lines appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(String, u64)> {
        let mut ids: Vec<&String> = self.inner.evaluators.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| {
                let ev = self.inner.evaluators.get(id)?;
                Some((
                    format!("scriptgate_pool_available{{evaluator=\"{id}\"}}"),
                    ev.pool().available() as u64,
                ))
            })
            .collect()
    }
}
