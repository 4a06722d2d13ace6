use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::registry::AgentCommand;

/// Environment variable the optional request credential is forwarded
/// through. Never passed on the command line.
pub const CREDENTIAL_ENV: &str = "LLM_API_KEY";

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("agent timed out after {0}s")]
    TimedOut(u64),
    #[error("failed to launch agent process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Captured output of a finished agent process.
#[derive(Debug, Clone)]
pub struct ExecCapture {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Process boundary for agent invocation. The dispatcher only sees this
/// trait, so it can be exercised without spawning real processes.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        command: &AgentCommand,
        payload: &str,
        credential: Option<&str>,
    ) -> Result<ExecCapture, InvokeError>;
}

/// Invoker backed by real child processes, bounded by a wall-clock timeout
/// and a per-stream output cap.
pub struct ProcessInvoker {
    timeout_secs: u64,
    max_output_bytes: usize,
}

impl ProcessInvoker {
    pub fn new(timeout_secs: u64, max_output_bytes: usize) -> Self {
        Self {
            timeout_secs,
            max_output_bytes,
        }
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(
        &self,
        command: &AgentCommand,
        payload: &str,
        credential: Option<&str>,
    ) -> Result<ExecCapture, InvokeError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(key) = credential {
            cmd.env(CREDENTIAL_ENV, key);
        }

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| InvokeError::TimedOut(self.timeout_secs))??;

        Ok(ExecCapture {
            stdout: capture_text(&output.stdout, self.max_output_bytes),
            stderr: capture_text(&output.stderr, self.max_output_bytes),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        })
    }
}

fn capture_text(bytes: &[u8], cap: usize) -> String {
    if bytes.len() <= cap {
        return String::from_utf8_lossy(bytes).to_string();
    }

    let mut text = String::from_utf8_lossy(&bytes[..cap]).to_string();
    text.push_str("\n[output truncated]");
    text
}
