//! Argument handling and the sync run behind the `basecrm-sync` binary.

use anyhow::{Context, Result};
use basecrm_sync::{AckMode, HttpConfig, HttpTransport, SyncClient, SyncConfig, SyncReport, SyncService};
use basecrm_types::{Attributes, DeviceId, EventType, Meta};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "basecrm-sync")]
#[command(about = "Pull pending changes from the Base CRM sync API and print them as JSON lines")]
pub struct Args {
    /// API root URL
    #[arg(long, env = "BASECRM_BASE_URL", default_value = "https://api.getbase.com/v2")]
    pub base_url: String,

    /// OAuth2 access token
    #[arg(long, env = "BASECRM_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Device identifier; a new one is generated when omitted
    #[arg(long, env = "BASECRM_DEVICE_UUID")]
    pub device_id: Option<String>,

    /// When to acknowledge consumed records
    #[arg(long, value_enum, default_value = "per-page")]
    pub ack_mode: AckModeArg,

    /// Maximum pages fetched per queue
    #[arg(long)]
    pub max_pages: Option<u64>,

    /// Print records without acknowledging them
    #[arg(long)]
    pub dry_run: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AckModeArg {
    PerPage,
    PerRun,
}

impl From<AckModeArg> for AckMode {
    fn from(arg: AckModeArg) -> Self {
        match arg {
            AckModeArg::PerPage => AckMode::PerPage,
            AckModeArg::PerRun => AckMode::PerRun,
        }
    }
}

/// One printed record.
#[derive(Debug, Serialize)]
pub struct RecordLine<'a> {
    #[serde(rename = "type")]
    pub record_type: &'a str,
    pub event_type: EventType,
    pub ack_key: &'a str,
    pub data: &'a Attributes,
}

impl Args {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.base_url.clone(),
            access_token: self.token.clone(),
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            ack_mode: self.ack_mode.into(),
            max_pages_per_queue: self.max_pages,
        }
    }

    /// Resolves the device identifier, generating one if none was given.
    pub fn device_id(&self) -> Result<DeviceId> {
        match &self.device_id {
            Some(id) => DeviceId::new(id.as_str()).context("Invalid device identifier"),
            None => {
                let id = DeviceId::generate();
                info!(device_id = %id, "Generated device identifier; pass it with --device-id on later runs");
                Ok(id)
            }
        }
    }
}

/// Runs one sync, writing every record to `out` as a JSON line.
pub async fn run<W: Write + Send>(args: &Args, mut out: W) -> Result<SyncReport> {
    let device_id = args.device_id()?;
    let transport = HttpTransport::new(args.http_config()).context("Failed to create HTTP transport")?;
    let accept = !args.dry_run;

    let mut sync = SyncClient::with_predicate(
        SyncService::new(transport),
        device_id,
        |meta: &Meta, data: &Attributes| {
            let line = RecordLine {
                record_type: meta.record_type().as_str(),
                event_type: meta.event_type(),
                ack_key: meta.ack_key().as_str(),
                data,
            };
            match serde_json::to_writer(&mut out, &line).and_then(|()| {
                writeln!(out).map_err(serde_json::Error::io)
            }) {
                Ok(()) => accept,
                Err(e) => {
                    warn!(error = %e, ack_key = %meta.ack_key(), "Failed to write record");
                    false
                }
            }
        },
    )
    .with_config(args.sync_config());

    let report = sync.run().await;
    info!(
        state = ?report.state,
        pages = report.pages_fetched,
        received = report.records_received,
        acked = report.records_acked,
        "Sync finished"
    );
    Ok(report)
}
