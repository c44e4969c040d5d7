//! External command executor seam.
//!
//! The device bridge is opaque to the fuzzer: it takes one shell-style
//! command line and hands back stdout, stderr and an exit status. Production
//! runs go through `adb shell`; tests substitute scripted executors.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Captured output of one executor invocation.
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutorOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Opaque command executor with stdout/stderr/exit-code semantics.
///
/// `run` resolves when the command finishes; the harness imposes its own
/// timeout around the call.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<ExecutorOutput>;
}

/// Delivers commands to the device through `adb shell`.
#[derive(Debug, Clone)]
pub struct AdbShellExecutor {
    adb_path: String,
}

impl AdbShellExecutor {
    pub fn new(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }
}

impl Default for AdbShellExecutor {
    fn default() -> Self {
        Self::new("adb")
    }
}

#[async_trait]
impl CommandExecutor for AdbShellExecutor {
    async fn run(&self, command_line: &str) -> Result<ExecutorOutput> {
        let output = tokio::process::Command::new(&self.adb_path)
            .arg("shell")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run '{} shell'. Is adb installed?", self.adb_path))?;

        Ok(ExecutorOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
