//! Base CRM sync runner
//!
//! Runs one incremental sync against the Base CRM API and prints every
//! pending record to stdout as a JSON line. Records are acknowledged once
//! printed, unless `--dry-run` is given.
//!
//! Usage:
//!   basecrm-sync --token $BASECRM_ACCESS_TOKEN --device-id <uuid>
//!
//! Logs go to stderr so stdout can be piped.

use anyhow::Result;
use basecrm_sync_cli::{Args, run};
use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let report = run(&args, std::io::stdout()).await?;

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
