//! Fuzzing execution loop.
//!
//! Walks transaction codes and argument counts, pulls the lazy command space
//! for each pair, and drives every command through the harness. Supports a
//! strictly sequential baseline and a bounded worker pool; in both modes the
//! generation cursor (not completion order) is the unit of resumability.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, ensure, Result};
use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::catalog::ParcelValueCatalog;
use crate::command::Command;
use crate::cursor::{CheckpointStore, ClaimLedger, FuzzCursor};
use crate::executor::CommandExecutor;
use crate::generator::{CommandSpace, Sampling};
use crate::harness::{ExecutionHarness, DEFAULT_COMMAND_TIMEOUT};
use crate::logging::FuzzLogger;
use crate::report::RunSummary;

/// Configuration for a fuzz run.
#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// Target Binder service name.
    pub service_name: String,
    /// Highest transaction code to probe (codes start at 1).
    pub max_code: u32,
    /// Highest argument count to probe (counts start at 1).
    pub max_args: usize,
    /// Per-command execution bound.
    pub timeout: Duration,
    /// In-flight executions; 1 means the sequential baseline.
    pub concurrency: usize,
    /// Volume-control strategy for value enumeration.
    pub sampling: Sampling,
    /// Hard ceiling on commands executed this run.
    pub max_commands: Option<u64>,
    /// Cursor checkpoint file; absent means no persistence.
    pub checkpoint_path: Option<PathBuf>,
}

impl FuzzConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            max_code: 1024,
            max_args: 5,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            concurrency: 1,
            sampling: Sampling::Full,
            max_commands: None,
            checkpoint_path: None,
        }
    }
}

/// Run-scoped cancellation flag, checked between units of work. In-flight
/// executions finish or hit their own timeout; they are not killed.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    remaining: Option<u64>,
}

impl Budget {
    fn new(limit: Option<u64>) -> Self {
        Self { remaining: limit }
    }

    fn exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }

    fn take(&mut self) {
        if let Some(remaining) = &mut self.remaining {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

struct PoolState {
    space: CommandSpace,
    ledger: ClaimLedger,
    remaining: Option<u64>,
}

/// Drives a full fuzz pass for one service.
pub struct FuzzRunner {
    catalog: Arc<ParcelValueCatalog>,
    executor: Arc<dyn CommandExecutor>,
    logger: Arc<FuzzLogger>,
}

impl FuzzRunner {
    pub fn new(
        catalog: Arc<ParcelValueCatalog>,
        executor: Arc<dyn CommandExecutor>,
        logger: Arc<FuzzLogger>,
    ) -> Self {
        Self {
            catalog,
            executor,
            logger,
        }
    }

    /// Execute the pass described by `config`, resuming from the checkpoint
    /// when one exists. A single command's failure or timeout never aborts
    /// the loop; the only errors surfaced here are configuration and
    /// checkpoint I/O problems.
    pub async fn run(&self, config: &FuzzConfig, stop: &StopSignal) -> Result<RunSummary> {
        ensure!(config.max_code >= 1, "max_code must be >= 1");
        ensure!(config.max_args >= 1, "max_args must be >= 1");
        ensure!(config.concurrency >= 1, "concurrency must be >= 1");

        let store = config.checkpoint_path.as_ref().map(CheckpointStore::new);
        let resume = match &store {
            Some(store) => store.load()?.unwrap_or_else(FuzzCursor::start),
            None => FuzzCursor::start(),
        };
        let harness = ExecutionHarness::new(Arc::clone(&self.executor), Arc::clone(&self.logger))
            .with_timeout(config.timeout);

        let mut summary = RunSummary::new(&config.service_name);
        let mut budget = Budget::new(config.max_commands);
        let started = Instant::now();

        'pass: for code in resume.code..=config.max_code {
            for args_count in 1..=config.max_args {
                if code == resume.code && args_count < resume.args_count {
                    continue;
                }
                if stop.is_triggered() || budget.exhausted() {
                    break 'pass;
                }

                let mut space =
                    CommandSpace::new(&self.catalog, &config.service_name, code, args_count)?
                        .with_sampling(config.sampling);
                if code == resume.code && args_count == resume.args_count {
                    space.seek(resume.schema_index, resume.value_index)?;
                }
                tracing::debug!(code, args_count, schemas = space.schema_count(), "fuzzing pair");

                let pair_summary = if config.concurrency <= 1 {
                    self.run_sequential(
                        space,
                        &harness,
                        code,
                        args_count,
                        store.as_ref(),
                        stop,
                        &mut budget,
                    )
                    .await?
                } else {
                    self.run_pooled(
                        space,
                        &harness,
                        code,
                        args_count,
                        config.concurrency,
                        store.as_ref(),
                        stop,
                        &mut budget,
                    )
                    .await?
                };
                summary.merge(&pair_summary);

                // The pair completed cleanly; move the checkpoint to the next
                // pair so a resumed run does not replay it.
                if !stop.is_triggered() && !budget.exhausted() {
                    if let Some(store) = &store {
                        store.save(&next_pair_cursor(code, args_count, config))?;
                    }
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    async fn run_sequential(
        &self,
        mut space: CommandSpace,
        harness: &ExecutionHarness,
        code: u32,
        args_count: usize,
        store: Option<&CheckpointStore>,
        stop: &StopSignal,
        budget: &mut Budget,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new(harness_service(&space));
        loop {
            if stop.is_triggered() || budget.exhausted() {
                if let Some(store) = store {
                    let (schema_index, value_index) = space.position();
                    store.save(&FuzzCursor::at(code, args_count, schema_index, value_index))?;
                }
                break;
            }
            let Some(command) = space.next_command() else {
                break;
            };
            let outcome = harness.execute(&command).await;
            summary.record(&outcome);
            budget.take();
            if let Some(store) = store {
                let (schema_index, value_index) = space.position();
                store.save(&FuzzCursor::at(code, args_count, schema_index, value_index))?;
            }
        }
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pooled(
        &self,
        space: CommandSpace,
        harness: &ExecutionHarness,
        code: u32,
        args_count: usize,
        workers: usize,
        store: Option<&CheckpointStore>,
        stop: &StopSignal,
        budget: &mut Budget,
    ) -> Result<RunSummary> {
        let service_name = harness_service(&space);
        let (start_schema, start_value) = space.position();
        let state = Arc::new(Mutex::new(PoolState {
            space,
            ledger: ClaimLedger::new(FuzzCursor::at(code, args_count, start_schema, start_value)),
            remaining: budget.remaining,
        }));

        let mut join_set: JoinSet<RunSummary> = JoinSet::new();
        for _ in 0..workers {
            let state = Arc::clone(&state);
            let harness = harness.clone();
            let stop = stop.clone();
            let store = store.cloned();
            let service_name = service_name.clone();
            join_set.spawn(async move {
                let mut local = RunSummary::new(service_name);
                loop {
                    if stop.is_triggered() {
                        break;
                    }
                    let Some((seq, command)) = claim_next(&state, code, args_count) else {
                        break;
                    };
                    let outcome = harness.execute(&command).await;
                    local.record(&outcome);

                    // Persisted under the claim lock: an older resume point
                    // must never reach the file after a newer one.
                    let saved = {
                        let mut guard = state.lock();
                        guard.ledger.complete(seq);
                        match &store {
                            Some(store) => store.save(&guard.ledger.resume_point()),
                            None => Ok(()),
                        }
                    };
                    if let Err(e) = saved {
                        tracing::warn!(error = %e, "checkpoint write failed");
                    }
                }
                local
            });
        }

        let mut summary = RunSummary::new(service_name);
        while let Some(joined) = join_set.join_next().await {
            let local = joined.map_err(|e| anyhow!("fuzz worker panicked: {}", e))?;
            summary.merge(&local);
        }
        budget.remaining = state.lock().remaining;
        Ok(summary)
    }
}

/// Claim the next unclaimed command under the single-writer cursor lock.
fn claim_next(state: &Mutex<PoolState>, code: u32, args_count: usize) -> Option<(u64, Command)> {
    let mut guard = state.lock();
    if matches!(guard.remaining, Some(0)) {
        return None;
    }
    let (schema_index, value_index) = guard.space.position();
    let command = guard.space.next_command()?;
    let at = FuzzCursor::at(code, args_count, schema_index, value_index);
    let (next_schema, next_value) = guard.space.position();
    let next = FuzzCursor::at(code, args_count, next_schema, next_value);
    let seq = guard.ledger.claim(at, next);
    if let Some(remaining) = &mut guard.remaining {
        *remaining -= 1;
    }
    Some((seq, command))
}

fn harness_service(space: &CommandSpace) -> String {
    space.service_name().to_string()
}

fn next_pair_cursor(code: u32, args_count: usize, config: &FuzzConfig) -> FuzzCursor {
    if args_count < config.max_args {
        FuzzCursor::at(code, args_count + 1, 0, 0)
    } else {
        FuzzCursor::at(code + 1, 1, 0, 0)
    }
}
