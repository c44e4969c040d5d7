//! Run position checkpointing.
//!
//! The whole fuzz pass is addressed by a four-part cursor
//! `(code, args_count, schema_index, value_index)`. The cursor always points
//! at the next command to execute, so a resumed run emits the exact suffix of
//! the original sequence. Under the worker pool the persisted position is the
//! low watermark of claimed work, not wall-clock completion order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Position of the next command to execute within a fuzz pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuzzCursor {
    pub code: u32,
    pub args_count: usize,
    pub schema_index: u64,
    pub value_index: u64,
}

impl FuzzCursor {
    /// Start of the full pass: first code, single argument, first schema.
    pub fn start() -> Self {
        Self {
            code: 1,
            args_count: 1,
            schema_index: 0,
            value_index: 0,
        }
    }

    pub fn at(code: u32, args_count: usize, schema_index: u64, value_index: u64) -> Self {
        Self {
            code,
            args_count,
            schema_index,
            value_index,
        }
    }
}

/// JSON-file persistence for the cursor.
///
/// Saves go through a temp file and a rename, serialized across clones, so a
/// reader never observes a torn or interleaved checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, cursor: &FuzzCursor) -> Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(cursor)?;
        let staged = self.path.with_extension("tmp");
        fs::write(&staged, json)
            .with_context(|| format!("write checkpoint {}", staged.display()))?;
        fs::rename(&staged, &self.path)
            .with_context(|| format!("commit checkpoint {}", self.path.display()))?;
        Ok(())
    }

    /// Load the saved cursor, or `None` if no checkpoint exists yet.
    pub fn load(&self) -> Result<Option<FuzzCursor>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("read checkpoint {}", self.path.display()))?;
        let cursor = serde_json::from_str(&json)
            .with_context(|| format!("parse checkpoint {}", self.path.display()))?;
        Ok(Some(cursor))
    }
}

/// Single-authority ledger of claimed work under the worker pool.
///
/// Workers claim units in generation order and complete them in any order;
/// the resume point only ever advances through the contiguous completed
/// prefix, so a crash mid-pool re-runs in-flight work instead of skipping it.
#[derive(Debug)]
pub struct ClaimLedger {
    next_seq: u64,
    in_flight: BTreeMap<u64, FuzzCursor>,
    /// Position after the most recently claimed command.
    frontier: FuzzCursor,
}

impl ClaimLedger {
    pub fn new(start: FuzzCursor) -> Self {
        Self {
            next_seq: 0,
            in_flight: BTreeMap::new(),
            frontier: start,
        }
    }

    /// Record a claim for the command at `at`; `next` is the generator
    /// position after it. Returns the claim's sequence number.
    pub fn claim(&mut self, at: FuzzCursor, next: FuzzCursor) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq, at);
        self.frontier = next;
        seq
    }

    pub fn complete(&mut self, seq: u64) {
        self.in_flight.remove(&seq);
    }

    /// Oldest claimed-but-incomplete position, or the frontier when nothing
    /// is in flight.
    pub fn resume_point(&self) -> FuzzCursor {
        self.in_flight
            .values()
            .next()
            .copied()
            .unwrap_or(self.frontier)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn checkpoint_round_trips_through_json() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::new(temp.path().join("cursor.json"));
        assert_eq!(store.load().unwrap(), None);

        let cursor = FuzzCursor::at(17, 3, 44, 120);
        store.save(&cursor).unwrap();
        assert_eq!(store.load().unwrap(), Some(cursor));
    }

    #[test]
    fn concurrent_saves_never_tear_the_checkpoint() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::new(temp.path().join("cursor.json"));

        // Mixed payload lengths from several writers; a torn write would make
        // the final load fail to parse.
        let handles: Vec<_> = (0..8u32)
            .map(|code| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        store
                            .save(&FuzzCursor::at(code + 1, 1, i, i * 1_000_000_007))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load().unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn cursor_ordering_follows_field_order() {
        assert!(FuzzCursor::at(1, 1, 0, 5) < FuzzCursor::at(1, 1, 1, 0));
        assert!(FuzzCursor::at(1, 2, 0, 0) < FuzzCursor::at(2, 1, 0, 0));
    }

    #[test]
    fn out_of_order_completion_advances_only_contiguous_prefix() {
        let mut ledger = ClaimLedger::new(FuzzCursor::start());
        let a = ledger.claim(FuzzCursor::at(1, 1, 0, 0), FuzzCursor::at(1, 1, 0, 1));
        let b = ledger.claim(FuzzCursor::at(1, 1, 0, 1), FuzzCursor::at(1, 1, 0, 2));
        let c = ledger.claim(FuzzCursor::at(1, 1, 0, 2), FuzzCursor::at(1, 1, 0, 3));

        // b and c finish first; a is still in flight.
        ledger.complete(b);
        ledger.complete(c);
        assert_eq!(ledger.resume_point(), FuzzCursor::at(1, 1, 0, 0));

        ledger.complete(a);
        assert_eq!(ledger.resume_point(), FuzzCursor::at(1, 1, 0, 3));
        assert_eq!(ledger.in_flight_count(), 0);
    }

    #[test]
    fn resume_point_is_frontier_when_idle() {
        let ledger = ClaimLedger::new(FuzzCursor::at(5, 2, 10, 7));
        assert_eq!(ledger.resume_point(), FuzzCursor::at(5, 2, 10, 7));
    }
}
