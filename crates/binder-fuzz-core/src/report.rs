//! Outcome classification and run-level result types.

use serde::{Deserialize, Serialize};

/// Terminal classification of one command's execution.
///
/// Per command the state machine is `Pending -> Running -> <one of these>`;
/// there are no transitions back and no automatic retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionOutcome {
    /// Exit within the timeout with a success status.
    Completed { stdout: String },
    /// The timeout elapsed before the executor finished.
    TimedOut,
    /// Nonzero exit status (or the executor itself could not run).
    Failed { stderr: String },
    /// Nonzero exit whose error text carries the out-of-memory marker.
    /// A refinement of `Failed`, reported at elevated severity.
    CriticalFailure { stderr: String },
}

impl ExecutionOutcome {
    /// Severity of the terminal record emitted for this outcome.
    pub fn severity(&self) -> Severity {
        match self {
            ExecutionOutcome::Completed { .. } => Severity::Info,
            ExecutionOutcome::TimedOut => Severity::Error,
            ExecutionOutcome::Failed { .. } => Severity::Error,
            ExecutionOutcome::CriticalFailure { .. } => Severity::Critical,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, ExecutionOutcome::Completed { .. })
    }
}

/// Record severity for the result sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Aggregate counts for a fuzz run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub service_name: String,
    /// Commands executed (claimed and classified).
    pub executed: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub failed: u64,
    pub critical_failures: u64,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &ExecutionOutcome) {
        self.executed += 1;
        match outcome {
            ExecutionOutcome::Completed { .. } => self.completed += 1,
            ExecutionOutcome::TimedOut => self.timed_out += 1,
            ExecutionOutcome::Failed { .. } => self.failed += 1,
            ExecutionOutcome::CriticalFailure { .. } => {
                // Critical failures are failures too.
                self.failed += 1;
                self.critical_failures += 1;
            }
        }
    }

    /// Fold another summary's counts into this one (worker-pool merge).
    pub fn merge(&mut self, other: &RunSummary) {
        self.executed += other.executed;
        self.completed += other.completed;
        self.timed_out += other.timed_out;
        self.failed += other.failed;
        self.critical_failures += other.critical_failures;
    }
}
