use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use binder_fuzz_core::Sampling;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Target Binder service name (as listed by `adb shell service list`).
    pub service_name: String,

    /// Highest transaction code to probe (codes start at 1).
    #[arg(long, default_value_t = 1024)]
    pub max_code: u32,

    /// Highest argument count to probe (counts start at 1).
    #[arg(long, default_value_t = 5)]
    pub max_args: usize,

    /// Per-command timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Concurrent in-flight executions. 1 keeps the strictly sequential
    /// baseline; higher values should respect the device's capacity.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Result log file (JSONL, appended).
    #[arg(long, value_name = "PATH", default_value = "fuzzing_results.log")]
    pub log_file: PathBuf,

    /// Cursor checkpoint file; if it exists the run resumes from it.
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Execute only every Nth value combination within each schema.
    #[arg(long, value_name = "N", conflicts_with_all = ["sample_seed", "sample_keep_one_in"])]
    pub stride: Option<u64>,

    /// Seed for random subset sampling.
    #[arg(long, value_name = "SEED", requires = "sample_keep_one_in")]
    pub sample_seed: Option<u64>,

    /// Keep roughly one in N value combinations (requires --sample-seed).
    #[arg(long, value_name = "N", requires = "sample_seed")]
    pub sample_keep_one_in: Option<u64>,

    /// Hard ceiling on commands executed this run.
    #[arg(long, value_name = "N")]
    pub max_commands: Option<u64>,

    /// Path to the adb binary.
    #[arg(long, default_value = "adb")]
    pub adb_path: String,
}

impl Args {
    pub fn sampling(&self) -> Result<Sampling> {
        match (self.stride, self.sample_seed, self.sample_keep_one_in) {
            (Some(n), None, None) => {
                if n == 0 {
                    return Err(anyhow!("--stride must be >= 1"));
                }
                Ok(Sampling::Stride(n))
            }
            (None, Some(seed), Some(keep_one_in)) => {
                if keep_one_in == 0 {
                    return Err(anyhow!("--sample-keep-one-in must be >= 1"));
                }
                Ok(Sampling::Random { seed, keep_one_in })
            }
            (None, None, None) => Ok(Sampling::Full),
            // clap's requires/conflicts_with rules make the remaining
            // combinations unrepresentable from the command line.
            _ => Err(anyhow!(
                "--stride and --sample-seed/--sample-keep-one-in are mutually exclusive"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_run() {
        let args = Args::parse_from(["binder-fuzz", "phone"]);
        assert_eq!(args.service_name, "phone");
        assert_eq!(args.max_code, 1024);
        assert_eq!(args.max_args, 5);
        assert_eq!(args.timeout_secs, 10);
        assert_eq!(args.concurrency, 1);
        assert!(matches!(args.sampling().unwrap(), Sampling::Full));
    }

    #[test]
    fn stride_and_random_sampling_parse() {
        let args = Args::parse_from(["binder-fuzz", "phone", "--stride", "5"]);
        assert!(matches!(args.sampling().unwrap(), Sampling::Stride(5)));

        let args = Args::parse_from([
            "binder-fuzz",
            "phone",
            "--sample-seed",
            "42",
            "--sample-keep-one-in",
            "8",
        ]);
        assert!(matches!(
            args.sampling().unwrap(),
            Sampling::Random {
                seed: 42,
                keep_one_in: 8
            }
        ));
    }

    #[test]
    fn missing_service_name_is_a_parse_error() {
        assert!(Args::try_parse_from(["binder-fuzz"]).is_err());
    }

    #[test]
    fn stride_conflicts_with_random_sampling() {
        assert!(Args::try_parse_from([
            "binder-fuzz",
            "phone",
            "--stride",
            "2",
            "--sample-seed",
            "1",
            "--sample-keep-one-in",
            "4",
        ])
        .is_err());
    }
}
