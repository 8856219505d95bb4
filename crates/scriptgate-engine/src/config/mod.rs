//! Engine config loader (strict parsing).

pub mod schema;

use std::fs;

use scriptgate_core::error::{Result, ScriptGateError};

pub use schema::{EngineConfig, EvaluatorConfig, ServerSection};

pub fn load_from_file(path: &str) -> Result<EngineConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ScriptGateError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<EngineConfig> {
    let cfg: EngineConfig = serde_yaml::from_str(s)
        .map_err(|e| ScriptGateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
