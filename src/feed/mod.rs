use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::collections::BTreeSet;
use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::types::Event;
use crate::api::FeedApi;
use crate::config::{ClientConfig, PollConfig};
use crate::event_kind::EventKind;
use crate::filter::FilterState;
use crate::identity::{CliHost, HostPlatform, IdentityResolver, ResolvedIdentity, ViewerId};
use crate::sync::{FeedSync, SyncState};
use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;
use crate::view::{self, RenderOpts};

pub mod types;

/// Where the viewer id comes from.
#[derive(Args, Clone, Debug, Default)]
pub struct ViewerArgs {
    /// Viewer id; skips the host context lookup
    #[arg(long)]
    pub fid: Option<u64>,
    /// JSON file holding the host context (`{"user":{"fid":...}}`)
    #[arg(long)]
    pub context: Option<PathBuf>,
}

impl ViewerArgs {
    pub fn host(&self) -> CliHost {
        CliHost::new(self.fid, self.context.clone())
    }
}

/// gitcast feed
#[derive(Args, Clone, Debug)]
pub struct FeedCmd {
    #[command(flatten)]
    pub viewer: ViewerArgs,
    /// Max events per feed request
    #[arg(long)]
    pub limit: Option<u32>,
    /// Only show these event types (repeatable)
    #[arg(long = "type", value_enum)]
    pub types: Vec<EventKind>,
    /// Events needed before a cold start stops polling
    #[arg(long)]
    pub threshold: Option<u64>,
    #[arg(long)]
    pub max_attempts: Option<u32>,
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Open the event at this 1-based position (after filtering) in the browser
    #[arg(long)]
    pub open: Option<usize>,
}

impl FeedCmd {
    pub fn poll_config(&self, base: PollConfig) -> PollConfig {
        PollConfig {
            threshold: self.threshold.unwrap_or(base.threshold),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            interval: self.interval_ms.map(Duration::from_millis).unwrap_or(base.interval),
        }
    }

    /// Repeating a type on the command line does not switch it back off.
    pub fn filters(&self) -> FilterState {
        let kinds: BTreeSet<EventKind> = self.types.iter().copied().collect();
        FilterState::from_toggles(kinds)
    }
}

/// Resolves the viewer once and reports a fallback on the log.
pub async fn resolve_identity(host: &dyn HostPlatform, default: ViewerId) -> ResolvedIdentity {
    let resolver = IdentityResolver::new(default);
    let identity = resolver.resolve(host).await.clone();
    debug_assert!(resolver.is_ready());
    if let Some(advisory) = &identity.advisory {
        telemetry::feed().warn(advisory);
    }
    identity
}

/// Runs one sync cycle, logging every published state until it settles.
/// Ctrl-C tears the cycle down.
pub async fn drive(sync: &FeedSync, identity: &ResolvedIdentity) -> Result<SyncState> {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    drive_until(sync, identity, interrupt).await
}

async fn drive_until<S>(sync: &FeedSync, identity: &ResolvedIdentity, stop: S) -> Result<SyncState>
where
    S: Future<Output = ()>,
{
    let mut rx = sync.subscribe();
    let run = sync.run(identity);
    tokio::pin!(run);
    tokio::pin!(stop);
    let mut stopped = false;
    let outcome = loop {
        tokio::select! {
            biased;
            out = &mut run => break out,
            _ = &mut stop, if !stopped => {
                telemetry::feed().warn("interrupted; tearing down feed sync");
                sync.teardown();
                stopped = true;
            }
            Ok(()) = rx.changed() => report(&rx.borrow_and_update()),
        }
    };
    match outcome {
        Some(state) => Ok(state),
        None if stopped => bail!("feed sync interrupted"),
        None => Err(anyhow!("feed sync was superseded before it finished")),
    }
}

fn report(state: &SyncState) {
    let log = telemetry::feed();
    match state {
        SyncState::Loading { viewer } => log.debug_kv("loading feed", [("viewer", viewer.to_string())]),
        SyncState::Initializing { progress: None, .. } => {
            log.info("Indexing your GitHub data. This takes about a minute.")
        }
        SyncState::Initializing { progress: Some(p), .. } => log.info_kv(&p.message, [
            ("attempt", format!("{}/{}", p.attempt, p.max_attempts)),
        ]),
        other if other.is_terminal() => log.debug_kv("sync settled", [("state", other.name().to_string())]),
        _ => {}
    }
}

pub fn visible<'a>(state: &'a SyncState, filters: &FilterState) -> Vec<&'a Event> {
    match state {
        SyncState::Ready { snapshot, .. } => filters.apply(&snapshot.events),
        _ => Vec::new(),
    }
}

pub fn open_at(host: &dyn HostPlatform, events: &[&Event], index: usize) -> Result<()> {
    let Some(ev) = index.checked_sub(1).and_then(|i| events.get(i)) else {
        bail!("No event at position {} ({} shown)", index, events.len());
    };
    host.open_url(&ev.event_url)
}

pub fn render_opts() -> RenderOpts {
    RenderOpts { color: std::io::stdout().is_terminal(), now: chrono::Utc::now() }
}

pub async fn run(api: Arc<dyn FeedApi>, cfg: &ClientConfig, args: FeedCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::feed();
    let host = args.viewer.host();
    let identity = resolve_identity(&host, ViewerId(cfg.default_fid)).await;

    let sync = FeedSync::new(api, args.limit.unwrap_or(cfg.feed_limit), args.poll_config(cfg.poll));
    let state = drive(&sync, &identity).await?;

    let filters = args.filters();
    let shown = visible(&state, &filters);
    if let Some(idx) = args.open {
        open_at(&host, &shown, idx)?;
    }

    let _s = log.span(&FeedPhase::Render).entered();
    if telemetry::config::json_mode() {
        let out = types::FeedView::new(&identity, &state, filters.enabled(), &shown);
        log.result(&out, Some(started))?;
    } else {
        print!("{}", view::header());
        print!("{}", view::render_feed(&state, &filters, identity.advisory.as_deref(), &render_opts()));
    }
    if let SyncState::Error { message, .. } = state {
        bail!(message);
    }
    Ok(())
}
