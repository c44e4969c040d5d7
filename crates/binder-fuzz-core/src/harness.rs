//! Per-command execution and outcome classification.
//!
//! One command in, one terminal outcome out. A failure, timeout or target
//! crash is recorded through the sink and never propagates to the caller, so
//! a bad command can never halt the surrounding run.

use std::sync::Arc;
use std::time::Duration;

use crate::command::Command;
use crate::executor::CommandExecutor;
use crate::logging::FuzzLogger;
use crate::report::{ExecutionOutcome, Severity};

/// Hard bound on one executor invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Case-sensitive stderr marker for target out-of-memory conditions.
pub const OOM_MARKER: &str = "OutOfMemoryError";

/// Executes single commands against the external executor under a bounded
/// timeout and classifies the result.
#[derive(Clone)]
pub struct ExecutionHarness {
    executor: Arc<dyn CommandExecutor>,
    logger: Arc<FuzzLogger>,
    timeout: Duration,
}

impl ExecutionHarness {
    pub fn new(executor: Arc<dyn CommandExecutor>, logger: Arc<FuzzLogger>) -> Self {
        Self {
            executor,
            logger,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one command to a terminal outcome. Never retries.
    ///
    /// Classification, first match wins: success within the timeout ->
    /// `Completed`; deadline elapsed -> `TimedOut`; nonzero exit -> `Failed`,
    /// escalated to `CriticalFailure` when stderr carries [`OOM_MARKER`].
    /// For the escalated case both the error record and the critical record
    /// are emitted.
    pub async fn execute(&self, command: &Command) -> ExecutionOutcome {
        let line = command.render();
        self.emit(Severity::Info, format!("Executing command: {}", line));

        let outcome = match tokio::time::timeout(self.timeout, self.executor.run(&line)).await {
            Err(_elapsed) => {
                self.emit(Severity::Error, format!("Command timed out: {}", line));
                ExecutionOutcome::TimedOut
            }
            Ok(Err(e)) => {
                // The bridge itself failed to run; classified like a failed
                // command so the run keeps going.
                let stderr = format!("{:#}", e);
                self.emit(
                    Severity::Error,
                    format!("Error executing command: {}", stderr),
                );
                ExecutionOutcome::Failed { stderr }
            }
            Ok(Ok(output)) if output.success() => {
                self.emit(Severity::Info, format!("Command output: {}", output.stdout));
                ExecutionOutcome::Completed {
                    stdout: output.stdout,
                }
            }
            Ok(Ok(output)) => {
                self.emit(
                    Severity::Error,
                    format!("Error executing command: {}", output.stderr),
                );
                if output.stderr.contains(OOM_MARKER) {
                    self.emit(
                        Severity::Critical,
                        format!("OutOfMemoryError encountered: {}", output.stderr),
                    );
                    ExecutionOutcome::CriticalFailure {
                        stderr: output.stderr,
                    }
                } else {
                    ExecutionOutcome::Failed {
                        stderr: output.stderr,
                    }
                }
            }
        };

        tracing::debug!(
            command = %line,
            outcome = outcome.severity().as_str(),
            "command classified"
        );
        outcome
    }

    fn emit(&self, severity: Severity, message: String) {
        if let Err(e) = self.logger.log(severity, message) {
            tracing::warn!(error = %e, "result sink write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ValueType;
    use crate::executor::ExecutorOutput;
    use crate::logging::{LogConfig, LogRecord};
    use anyhow::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    struct ScriptedExecutor {
        output: ExecutorOutput,
        calls: Mutex<u64>,
    }

    impl ScriptedExecutor {
        fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
            Self {
                output: ExecutorOutput {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    exit_code,
                },
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn run(&self, _command_line: &str) -> Result<ExecutorOutput> {
            *self.calls.lock() += 1;
            Ok(self.output.clone())
        }
    }

    struct HangingExecutor {
        calls: Mutex<u64>,
    }

    #[async_trait]
    impl CommandExecutor for HangingExecutor {
        async fn run(&self, _command_line: &str) -> Result<ExecutorOutput> {
            *self.calls.lock() += 1;
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("sleep outlives every harness timeout used in tests")
        }
    }

    fn sample_command() -> Command {
        Command {
            service_name: "phone".to_string(),
            transaction_code: 1,
            schema: vec![ValueType::I32],
            values: vec!["-1".to_string()],
        }
    }

    fn logger_in(temp: &TempDir) -> (Arc<FuzzLogger>, std::path::PathBuf) {
        let path = temp.path().join("run.log");
        let logger = Arc::new(FuzzLogger::new(LogConfig {
            enabled: true,
            path: path.clone(),
        }));
        (logger, path)
    }

    fn read_records(path: &std::path::Path) -> Vec<LogRecord> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn success_classifies_completed_at_info() {
        let temp = TempDir::new().unwrap();
        let (logger, path) = logger_in(&temp);
        let executor = Arc::new(ScriptedExecutor::new("Result: Parcel(NULL)", "", 0));
        let harness = ExecutionHarness::new(executor.clone(), logger);

        let outcome = harness.execute(&sample_command()).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "Result: Parcel(NULL)".to_string()
            }
        );
        assert_eq!(*executor.calls.lock(), 1);

        let records = read_records(&path);
        assert!(records.iter().all(|r| r.severity == Severity::Info));
    }

    #[tokio::test]
    async fn timeout_classifies_timed_out_without_retry() {
        let temp = TempDir::new().unwrap();
        let (logger, path) = logger_in(&temp);
        let executor = Arc::new(HangingExecutor {
            calls: Mutex::new(0),
        });
        let harness = ExecutionHarness::new(executor.clone(), logger)
            .with_timeout(Duration::from_millis(50));

        let outcome = harness.execute(&sample_command()).await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert_eq!(*executor.calls.lock(), 1, "timed-out commands are not retried");

        let records = read_records(&path);
        assert!(records
            .iter()
            .any(|r| r.severity == Severity::Error && r.message.contains("timed out")));
    }

    #[tokio::test]
    async fn nonzero_exit_classifies_failed_at_error() {
        let temp = TempDir::new().unwrap();
        let (logger, path) = logger_in(&temp);
        let executor = Arc::new(ScriptedExecutor::new("", "Parcel rejected", 1));
        let harness = ExecutionHarness::new(executor, logger);

        let outcome = harness.execute(&sample_command()).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                stderr: "Parcel rejected".to_string()
            }
        );

        let records = read_records(&path);
        assert!(records.iter().any(|r| r.severity == Severity::Error));
        assert!(records.iter().all(|r| r.severity != Severity::Critical));
    }

    #[tokio::test]
    async fn oom_stderr_escalates_and_reports_both_signals() {
        let temp = TempDir::new().unwrap();
        let (logger, path) = logger_in(&temp);
        let stderr = "java.lang.OutOfMemoryError: Failed to allocate";
        let executor = Arc::new(ScriptedExecutor::new("", stderr, 1));
        let harness = ExecutionHarness::new(executor, logger);

        let outcome = harness.execute(&sample_command()).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::CriticalFailure {
                stderr: stderr.to_string()
            }
        );

        let records = read_records(&path);
        assert!(records
            .iter()
            .any(|r| r.severity == Severity::Error && r.message.contains(stderr)));
        assert!(records
            .iter()
            .any(|r| r.severity == Severity::Critical && r.message.contains("OutOfMemoryError")));
    }

    #[tokio::test]
    async fn oom_marker_match_is_case_sensitive() {
        let temp = TempDir::new().unwrap();
        let (logger, _path) = logger_in(&temp);
        let executor = Arc::new(ScriptedExecutor::new("", "outofmemoryerror", 1));
        let harness = ExecutionHarness::new(executor, logger);

        let outcome = harness.execute(&sample_command()).await;
        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn executor_launch_failure_is_isolated_as_failed() {
        struct BrokenExecutor;

        #[async_trait]
        impl CommandExecutor for BrokenExecutor {
            async fn run(&self, _command_line: &str) -> Result<ExecutorOutput> {
                Err(anyhow::anyhow!("adb not found"))
            }
        }

        let temp = TempDir::new().unwrap();
        let (logger, _path) = logger_in(&temp);
        let harness = ExecutionHarness::new(Arc::new(BrokenExecutor), logger);
        let outcome = harness.execute(&sample_command()).await;
        match outcome {
            ExecutionOutcome::Failed { stderr } => assert!(stderr.contains("adb not found")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
