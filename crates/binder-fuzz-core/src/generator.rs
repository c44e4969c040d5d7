//! Deterministic command-space enumeration.
//!
//! A [`CommandSpace`] lazily enumerates every admissible argument-type schema
//! for a transaction code (combinations with replacement over the catalog's
//! type set, in declaration order) and, per schema, every value assignment
//! (mixed-radix counter over the per-position value lists, last position
//! fastest). The position `(schema_index, value_index)` is explicit, so a run
//! can be checkpointed and resumed without re-emitting or skipping commands.

use anyhow::{anyhow, ensure, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::{ParcelValueCatalog, ValueType};
use crate::command::Command;

/// Volume-control strategy applied to within-schema value indices.
///
/// Full enumeration grows combinatorially with the argument count, so a run
/// over more than 2-3 arguments needs a subset strategy. Both subset modes
/// decide membership from the index alone, which keeps sampled runs
/// deterministic and resume-safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sampling {
    /// Every value combination.
    Full,
    /// Every n-th value combination within each schema.
    Stride(u64),
    /// Seeded per-index selection keeping roughly one in `keep_one_in`.
    Random { seed: u64, keep_one_in: u64 },
}

impl Sampling {
    fn admits(&self, schema_index: u64, value_index: u64) -> bool {
        match *self {
            Sampling::Full => true,
            Sampling::Stride(n) => n <= 1 || value_index % n == 0,
            Sampling::Random { seed, keep_one_in } => {
                if keep_one_in <= 1 {
                    return true;
                }
                // Membership is a pure function of (seed, position) so that
                // resuming mid-schema re-selects the same subset.
                let mix = seed
                    ^ schema_index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    ^ value_index.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
                let mut rng = StdRng::seed_from_u64(mix);
                rng.gen_range(0..keep_one_in) == 0
            }
        }
    }
}

/// Number of length-`args_count` combinations with replacement over
/// `type_count` types: C(t + k - 1, k). `None` when the count does not fit a
/// 64-bit index.
pub fn schemas_for(type_count: usize, args_count: usize) -> Option<u64> {
    let n = (type_count as u64)
        .checked_add(args_count as u64)?
        .checked_sub(1)?;
    let k = args_count as u64;
    let mut result = 1u64;
    for i in 1..=k {
        result = result.checked_mul(n - k + i)? / i;
    }
    Some(result)
}

/// Lazy, restartable enumeration of every command for one
/// (service, transaction code, argument count) triple.
#[derive(Debug)]
pub struct CommandSpace {
    service_name: String,
    code: u32,
    args_count: usize,
    /// Value lists in [`ValueType::ALL`] order, copied from the catalog at
    /// construction so the space owns its corpus.
    per_type: Vec<Vec<String>>,
    sampling: Sampling,
    schema_count: u64,

    // Enumeration position.
    odometer: Vec<usize>,
    exhausted: bool,
    schema_index: u64,
    value_index: u64,
    schema_types: Vec<ValueType>,
    radices: Vec<u64>,
    schema_card: u64,
}

impl CommandSpace {
    pub fn new(
        catalog: &ParcelValueCatalog,
        service_name: impl Into<String>,
        code: u32,
        args_count: usize,
    ) -> Result<Self> {
        ensure!(code >= 1, "transaction code must be >= 1, got {}", code);
        ensure!(args_count >= 1, "argument count must be >= 1, got {}", args_count);

        let mut per_type = Vec::with_capacity(ValueType::ALL.len());
        for ty in ValueType::ALL {
            per_type.push(catalog.values_for(ty)?.to_vec());
        }

        let schema_count = schemas_for(per_type.len(), args_count).ok_or_else(|| {
            anyhow!(
                "schema count for {} arguments exceeds a 64-bit cursor; lower the argument count",
                args_count
            )
        })?;
        // The widest schema's cardinality bounds every per-schema value
        // index, so checking it here keeps the mixed-radix counter in range.
        let widest = per_type.iter().map(Vec::len).max().unwrap_or(1) as u64;
        let card_fits = u32::try_from(args_count)
            .ok()
            .and_then(|k| widest.checked_pow(k))
            .is_some();
        ensure!(
            card_fits,
            "value space for {} arguments exceeds a 64-bit cursor; lower the argument count",
            args_count
        );

        let mut space = Self {
            service_name: service_name.into(),
            code,
            args_count,
            per_type,
            sampling: Sampling::Full,
            schema_count,
            odometer: Vec::new(),
            exhausted: false,
            schema_index: 0,
            value_index: 0,
            schema_types: Vec::new(),
            radices: Vec::new(),
            schema_card: 0,
        };
        space.reset();
        Ok(space)
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Total number of distinct schemas in this space.
    pub fn schema_count(&self) -> u64 {
        self.schema_count
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Current position: the `(schema_index, value_index)` of the next
    /// candidate command.
    pub fn position(&self) -> (u64, u64) {
        (self.schema_index, self.value_index)
    }

    /// Rewind to the start of the space.
    pub fn reset(&mut self) {
        self.odometer = vec![0; self.args_count];
        self.exhausted = false;
        self.schema_index = 0;
        self.value_index = 0;
        self.load_schema();
    }

    /// Position the space exactly at `(schema_index, value_index)`, so the
    /// next command produced is the one the full enumeration would produce at
    /// that position (or the next admitted one under sampling).
    pub fn seek(&mut self, schema_index: u64, value_index: u64) -> Result<()> {
        ensure!(
            schema_index <= self.schema_count,
            "schema index {} out of range (space has {} schemas)",
            schema_index,
            self.schema_count
        );
        self.reset();
        for _ in 0..schema_index {
            self.advance_schema();
        }
        if self.exhausted {
            ensure!(
                value_index == 0,
                "value index must be 0 past the end of the space"
            );
            return Ok(());
        }
        ensure!(
            value_index <= self.schema_card,
            "value index {} out of range for schema {} ({} combinations)",
            value_index,
            schema_index,
            self.schema_card
        );
        self.value_index = value_index;
        Ok(())
    }

    /// Produce the next command, or `None` when the space is exhausted.
    pub fn next_command(&mut self) -> Option<Command> {
        loop {
            if self.exhausted {
                return None;
            }
            while self.value_index < self.schema_card
                && !self.sampling.admits(self.schema_index, self.value_index)
            {
                self.value_index += 1;
            }
            if self.value_index >= self.schema_card {
                self.advance_schema();
                continue;
            }
            let values = self.unrank(self.value_index);
            self.value_index += 1;
            return Some(Command {
                service_name: self.service_name.clone(),
                transaction_code: self.code,
                schema: self.schema_types.clone(),
                values,
            });
        }
    }

    /// Decode a within-schema index into the value tuple for the current
    /// schema. Mixed radix with the last position varying fastest.
    fn unrank(&self, mut index: u64) -> Vec<String> {
        let mut values = vec![String::new(); self.args_count];
        for position in (0..self.args_count).rev() {
            let radix = self.radices[position];
            let slot = (index % radix) as usize;
            index /= radix;
            values[position] = self.per_type[self.schema_types[position].ordinal()][slot].clone();
        }
        values
    }

    /// Step the non-decreasing odometer to the next schema.
    fn advance_schema(&mut self) {
        self.schema_index += 1;
        self.value_index = 0;
        let type_count = self.per_type.len();
        let bump = (0..self.args_count)
            .rev()
            .find(|&i| self.odometer[i] < type_count - 1);
        match bump {
            Some(i) => {
                let next = self.odometer[i] + 1;
                for slot in self.odometer[i..].iter_mut() {
                    *slot = next;
                }
                self.load_schema();
            }
            None => {
                self.exhausted = true;
                self.schema_types.clear();
                self.radices.clear();
                self.schema_card = 0;
            }
        }
    }

    fn load_schema(&mut self) {
        self.schema_types = self.odometer.iter().map(|&i| ValueType::ALL[i]).collect();
        self.radices = self
            .schema_types
            .iter()
            .map(|ty| self.per_type[ty.ordinal()].len() as u64)
            .collect();
        self.schema_card = self.radices.iter().product();
    }
}
