//! Spawn-per-request process runner.
//!
//! Lifecycle of one run:
//! 1. spawn with piped stdio and `kill_on_drop`, in a fresh process group on
//!    unix so anything the child starts can be killed with it,
//! 2. write the request to stdin and close it, concurrently with
//! 3. reading stdout through `read_bounded` and draining stderr,
//! 4. on overflow kill immediately; on timeout kill and report `Timeout`,
//! 5. always reap the child before returning.
//!
//! The group is killed whenever a run ends: overflow, timeout, I/O failure,
//! normal exit (stragglers left in the background) and cancellation (the
//! `GroupKill` guard is dropped with the future).

use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use scriptgate_core::error::{Result, ScriptGateError};

use super::reader::{read_bounded, read_capped};
use super::{Invocation, PolicyProcess};
use crate::config::EvaluatorConfig;

/// Grace period for the stdin writer / stderr drain once the child is gone.
const STDIO_GRACE: Duration = Duration::from_millis(200);

/// Variables passed through when the environment is not inherited.
const PASSTHROUGH_ENV: [&str; 2] = ["PATH", "LANG"];

/// Runs a configured command as the decision process.
#[derive(Debug, Clone)]
pub struct ScriptProcess {
    label: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
    max_stderr_bytes: usize,
    working_dir: Option<PathBuf>,
    inherit_env: bool,
    env: BTreeMap<String, String>,
}

impl ScriptProcess {
    pub fn from_config(cfg: &EvaluatorConfig) -> Result<Self> {
        let (program, args) = cfg.command.split_first().ok_or_else(|| {
            ScriptGateError::Config(format!("evaluators[{}].command is empty", cfg.id))
        })?;

        Ok(Self {
            label: cfg.command.join(" "),
            program: program.clone(),
            args: args.to_vec(),
            timeout: cfg.timeout(),
            max_output_bytes: cfg.max_output_bytes,
            max_stderr_bytes: cfg.max_stderr_bytes,
            working_dir: cfg.working_dir.clone(),
            inherit_env: cfg.inherit_env,
            env: cfg.env.clone(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        if !self.inherit_env {
            cmd.env_clear();
            for key in PASSTHROUGH_ENV {
                if let Ok(v) = std::env::var(key) {
                    cmd.env(key, v);
                }
            }
        }
        cmd.envs(&self.env);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl PolicyProcess for ScriptProcess {
    fn describe(&self) -> &str {
        &self.label
    }

    async fn run(&self, input: Bytes) -> Result<Invocation> {
        let started = Instant::now();

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| ScriptGateError::Spawn(format!("{}: {e}", self.program)))?;
        let pid = child.id();
        // Declared after `child` so it drops first, while the leader is unreaped.
        let mut group = GroupKill::new(pid);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScriptGateError::Internal("child stdin not piped".into()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScriptGateError::Internal("child stdout not piped".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScriptGateError::Internal("child stderr not piped".into()))?;

        let mut writer = tokio::spawn(write_request(stdin, input));
        let mut stderr_task = tokio::spawn(read_capped(stderr, self.max_stderr_bytes));

        let outcome = timeout(self.timeout, async {
            let out = read_bounded(&mut stdout, self.max_output_bytes).await?;
            if out.truncated {
                debug!(?pid, limit = self.max_output_bytes, "output ceiling hit, killing child");
                group.kill();
                if let Err(e) = child.start_kill() {
                    debug!(?pid, error = %e, "kill after overflow failed");
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((out, status))
        })
        .await;

        match outcome {
            Ok(Ok((out, status))) => {
                group.kill();
                if let Some(Err(e)) = settle(&mut writer).await {
                    debug!(?pid, error = %e, "request not fully written to child");
                }
                let stderr = settle(&mut stderr_task).await.unwrap_or_default();
                Ok(Invocation {
                    exit_code: status.code(),
                    success: status.success(),
                    stdout: out.bytes,
                    stderr,
                    elapsed: started.elapsed(),
                    output_truncated: out.truncated,
                    output_limit: self.max_output_bytes,
                })
            }
            Ok(Err(e)) => {
                group.kill();
                if let Err(kill_err) = child.kill().await {
                    debug!(?pid, error = %kill_err, "kill after io failure failed");
                }
                writer.abort();
                stderr_task.abort();
                Err(ScriptGateError::Io(e.to_string()))
            }
            Err(_) => {
                group.kill();
                if let Err(kill_err) = child.kill().await {
                    warn!(?pid, error = %kill_err, "failed to kill timed out child");
                }
                writer.abort();
                let stderr = settle(&mut stderr_task).await.unwrap_or_default();
                warn!(
                    ?pid,
                    timeout_ms = self.timeout.as_millis() as u64,
                    stderr = %stderr,
                    "decision process timed out"
                );
                Err(ScriptGateError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}

async fn write_request(mut stdin: ChildStdin, input: Bytes) -> std::io::Result<()> {
    match stdin.write_all(&input).await {
        Ok(()) => stdin.shutdown().await,
        // The child closed stdin early; its output still decides.
        Err(e) if e.kind() == IoErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e),
    }
}

/// Wait briefly for a helper task; abort it if it is still running.
async fn settle<T>(handle: &mut JoinHandle<T>) -> Option<T> {
    match timeout(STDIO_GRACE, &mut *handle).await {
        Ok(Ok(v)) => Some(v),
        Ok(Err(_)) => None,
        Err(_) => {
            handle.abort();
            None
        }
    }
}

/// SIGKILLs the child's process group once, on `kill()` or on drop.
struct GroupKill {
    pgid: Option<u32>,
}

impl GroupKill {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        // Group already empty.
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(pgid, error = %e, "killpg failed"),
    }
}

// Without process groups only the direct child is killed, via `kill_on_drop`.
#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}
