use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::time::Instant;
use tracing::Instrument;

use crate::api::FeedApi;
use crate::config::ClientConfig;
use crate::feed::{resolve_identity, ViewerArgs};
use crate::identity::{ResolvedIdentity, ViewerId};
use crate::telemetry::{self};
use crate::telemetry::ops::status::Phase as StatusPhase;

/// gitcast status: one indexing-status request for the viewer
#[derive(Args, Clone, Debug)]
pub struct StatusCmd {
    #[command(flatten)]
    pub viewer: ViewerArgs,
}

#[derive(Serialize)]
pub struct StatusReport {
    pub identity: ResolvedIdentity,
    pub events: u64,
}

pub async fn run(api: &dyn FeedApi, cfg: &ClientConfig, args: StatusCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::status();
    let identity = resolve_identity(&args.viewer.host(), ViewerId(cfg.default_fid)).await;
    let span = log.root_span_kv([("viewer", identity.viewer.to_string())]);
    let status = api
        .fetch_status(identity.viewer)
        .instrument(log.span(&StatusPhase::Fetch))
        .instrument(span)
        .await
        .context("fetch indexing status")?;

    let report = StatusReport { identity, events: status.stats.events };
    if telemetry::config::json_mode() {
        log.result(&report, Some(started))?;
    } else {
        println!("{} events indexed for viewer {}", report.events, report.identity.viewer);
    }
    Ok(())
}
