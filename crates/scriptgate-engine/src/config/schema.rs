use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use scriptgate_core::error::{Result, ScriptGateError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub evaluators: Vec<EvaluatorConfig>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ScriptGateError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.evaluators.is_empty() {
            return Err(ScriptGateError::Config("evaluators must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for ev in &self.evaluators {
            if !seen.insert(ev.id.as_str()) {
                return Err(ScriptGateError::Config(format!(
                    "duplicate evaluator id: {}",
                    ev.id
                )));
            }
            ev.validate()?;
        }

        Ok(())
    }

    pub fn evaluator(&self, id: &str) -> Option<&EvaluatorConfig> {
        self.evaluators.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8181".into()
}

/// One external decision process and its resource bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    pub id: String,

    /// Program followed by its arguments.
    pub command: Vec<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    #[serde(default = "default_max_concurrent_processes")]
    pub max_concurrent_processes: usize,

    /// How long a request may wait for a free process slot.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,

    #[serde(default = "default_max_stderr_bytes")]
    pub max_stderr_bytes: usize,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub inherit_env: bool,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl EvaluatorConfig {
    /// Config with defaults for everything but id and command.
    pub fn new(id: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            command,
            timeout_ms: default_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            max_concurrent_processes: default_max_concurrent_processes(),
            queue_timeout_ms: default_queue_timeout_ms(),
            max_stderr_bytes: default_max_stderr_bytes(),
            working_dir: None,
            inherit_env: false,
            env: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let id = &self.id;
        if id.is_empty() {
            return Err(ScriptGateError::Config("evaluator id must not be empty".into()));
        }
        match self.command.first() {
            Some(program) if !program.is_empty() => {}
            _ => {
                return Err(ScriptGateError::Config(format!(
                    "evaluators[{id}].command must name a program"
                )));
            }
        }
        if !(1..=600_000).contains(&self.timeout_ms) {
            return Err(ScriptGateError::Config(format!(
                "evaluators[{id}].timeout_ms must be between 1 and 600000"
            )));
        }
        if !(1..=MAX_OUTPUT_CEILING).contains(&self.max_output_bytes) {
            return Err(ScriptGateError::Config(format!(
                "evaluators[{id}].max_output_bytes must be between 1 and {MAX_OUTPUT_CEILING}"
            )));
        }
        if !(1..=1024).contains(&self.max_concurrent_processes) {
            return Err(ScriptGateError::Config(format!(
                "evaluators[{id}].max_concurrent_processes must be between 1 and 1024"
            )));
        }
        if self.queue_timeout_ms > 600_000 {
            return Err(ScriptGateError::Config(format!(
                "evaluators[{id}].queue_timeout_ms must be at most 600000"
            )));
        }
        if self.max_stderr_bytes > 1024 * 1024 {
            return Err(ScriptGateError::Config(format!(
                "evaluators[{id}].max_stderr_bytes must be at most 1048576"
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}

/// Hard upper bound for `max_output_bytes` (64 MiB).
const MAX_OUTPUT_CEILING: usize = 64 * 1024 * 1024;

fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_output_bytes() -> usize {
    1024 * 1024
}
fn default_max_concurrent_processes() -> usize {
    8
}
fn default_queue_timeout_ms() -> u64 {
    5000
}
fn default_max_stderr_bytes() -> usize {
    8192
}
