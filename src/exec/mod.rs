//! Thin subprocess plumbing for the external CLI suites the gateway wraps.

pub mod bw;
pub mod womtool;

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::core::error::GatewayError;

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Non-empty streams joined the way the upstream CLIs print them.
    pub fn combined(&self) -> String {
        let mut parts = Vec::new();
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        if !out.is_empty() {
            parts.push(out);
        }
        if !err.is_empty() {
            parts.push(err);
        }
        parts.join("\n")
    }
}

/// Run a program to completion, capturing both streams. A missing binary is
/// reported as such rather than bubbling a raw io error; argv is never logged
/// because `bw*` invocations carry credentials.
pub async fn run_capture(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<ProcessOutput, GatewayError> {
    tracing::debug!(program = program, argc = args.len(), "spawning external tool");

    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GatewayError::BinaryNotFound(program.to_string())
        } else {
            GatewayError::Io(e)
        }
    })?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| {
                GatewayError::ProcessFailed {
                    tool: program.to_string(),
                    status: "timeout".into(),
                    detail: format!("no result within {}s", limit.as_secs()),
                }
            })??,
        None => child.wait_with_output().await?,
    };

    Ok(ProcessOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Promote a non-zero exit into a [`GatewayError`] carrying both streams.
pub fn require_success(tool: &str, out: ProcessOutput) -> Result<ProcessOutput, GatewayError> {
    if out.success {
        Ok(out)
    } else {
        Err(GatewayError::ProcessFailed {
            tool: tool.to_string(),
            status: out.status.clone(),
            detail: out.combined(),
        })
    }
}
