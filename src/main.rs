//! Black-box Binder service fuzzer CLI.
//!
//! Enumerates typed-argument combinations for the target service's
//! transaction codes and drives each `service call` through `adb shell`,
//! classifying outcomes into an append-only JSONL log.
//!
//! **Key modes**
//! - Full pass: `binder-fuzz <service_name>`
//! - Resumable pass: `--checkpoint state/cursor.json` (re-run to resume)
//! - Sampled pass: `--stride N`, or `--sample-seed S --sample-keep-one-in N`
//! - Pooled pass: `--concurrency N` (cursor order still governs resume)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use binder_fuzz_core::{
    AdbShellExecutor, FuzzConfig, FuzzLogger, FuzzRunner, LogConfig, ParcelValueCatalog,
    StopSignal,
};

mod args;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let sampling = args.sampling()?;

    let catalog = Arc::new(ParcelValueCatalog::standard());
    let logger = Arc::new(FuzzLogger::new(LogConfig {
        enabled: true,
        path: args.log_file.clone(),
    }));
    let executor = Arc::new(AdbShellExecutor::new(args.adb_path.clone()));

    let config = FuzzConfig {
        service_name: args.service_name.clone(),
        max_code: args.max_code,
        max_args: args.max_args,
        timeout: Duration::from_secs(args.timeout_secs),
        concurrency: args.concurrency,
        sampling,
        max_commands: args.max_commands,
        checkpoint_path: args.checkpoint.clone(),
    };

    // Ctrl-C stops claiming new work; in-flight commands finish or time out.
    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("stop requested, finishing in-flight commands...");
                stop.trigger();
            }
        });
    }

    let runner = FuzzRunner::new(catalog, executor, Arc::clone(&logger));
    let summary = runner.run(&config, &stop).await?;
    logger.flush()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
