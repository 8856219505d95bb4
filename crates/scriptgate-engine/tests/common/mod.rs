//! Helpers shared by the script-driven tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use scriptgate_engine::config::EvaluatorConfig;
use scriptgate_engine::ScriptEvaluator;

pub fn script_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scripts")
        .join(name)
}

/// `sh <script> [args...]`, so the executable bit does not matter.
pub fn script_command(name: &str, args: &[&str]) -> Vec<String> {
    let mut cmd = vec!["sh".to_string(), script_path(name).display().to_string()];
    cmd.extend(args.iter().map(|a| a.to_string()));
    cmd
}

pub fn config_for(name: &str) -> EvaluatorConfig {
    EvaluatorConfig::new(name, script_command(name, &[]))
}

pub fn evaluator_for(name: &str) -> ScriptEvaluator {
    ScriptEvaluator::from_config(&config_for(name)).unwrap()
}

/// Unique scratch file path for this test process.
pub fn scratch_file(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("scriptgate-{tag}-{}.pid", std::process::id()))
}

/// Wait for a script to publish its pid.
pub async fn read_pid(path: &Path) -> u32 {
    for _ in 0..100 {
        if let Ok(s) = std::fs::read_to_string(path) {
            if let Ok(pid) = s.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("pid file {} never written", path.display());
}

/// Running (not gone, not a zombie).
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Field 3 follows the parenthesised command name.
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

#[cfg(target_os = "linux")]
pub async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..100 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
