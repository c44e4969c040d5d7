//! Black-box fuzzing engine for Android Binder service interfaces.
//!
//! Enumerates typed-argument combinations for a target service's transaction
//! codes and drives them through an external device bridge, classifying each
//! outcome for triage.
//!
//! # Architecture
//!
//! - [`catalog`]: Fixed corpus of literal parcel values per argument type
//! - [`generator`]: Deterministic, restartable command-space enumeration
//! - [`harness`]: Per-command execution under a hard timeout, with outcome
//!   classification and failure isolation
//! - [`cursor`]: Checkpoint types for crash-safe resume
//! - [`runner`]: Sequential and worker-pool execution loops
//! - [`logging`]: Append-only JSONL result sink
//! - [`report`]: Outcome and summary types
//! - [`executor`]: Seam to the opaque device command bridge

pub mod catalog;
pub mod command;
pub mod cursor;
pub mod executor;
pub mod generator;
pub mod harness;
pub mod logging;
pub mod report;
pub mod runner;

pub use catalog::{ParcelValueCatalog, ValueType};
pub use command::Command;
pub use cursor::{CheckpointStore, ClaimLedger, FuzzCursor};
pub use executor::{AdbShellExecutor, CommandExecutor, ExecutorOutput};
pub use generator::{schemas_for, CommandSpace, Sampling};
pub use harness::{ExecutionHarness, DEFAULT_COMMAND_TIMEOUT, OOM_MARKER};
pub use logging::{FuzzLogger, LogConfig, LogRecord, DEFAULT_LOG_FILE};
pub use report::{ExecutionOutcome, RunSummary, Severity};
pub use runner::{FuzzConfig, FuzzRunner, StopSignal};
