use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::api::FeedApi;
use crate::config::ClientConfig;
use crate::feed::types::FeedView;
use crate::feed::{self, FeedCmd};
use crate::identity::ViewerId;
use crate::repos::{self, types::RepoList};
use crate::sort::SortMode;
use crate::sync::{FeedSync, SyncState};
use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;
use crate::view;

/// gitcast dashboard: the feed and the top repositories side by side
#[derive(Args, Clone, Debug)]
pub struct DashboardCmd {
    #[command(flatten)]
    pub feed: FeedCmd,
    #[arg(long, value_enum, default_value_t = SortMode::None)]
    pub sort: SortMode,
}

#[derive(Serialize)]
struct DashboardView<'a> {
    feed: FeedView<'a>,
    repos: RepoList,
}

pub async fn run(api: Arc<dyn FeedApi>, cfg: &ClientConfig, args: DashboardCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::feed();
    let host = args.feed.viewer.host();
    let sync = FeedSync::new(api.clone(), args.feed.limit.unwrap_or(cfg.feed_limit), args.feed.poll_config(cfg.poll));

    // both tabs wait for the identity gate, then load side by side
    let identity = feed::resolve_identity(&host, ViewerId(cfg.default_fid)).await;
    let (state, list) = tokio::join!(feed::drive(&sync, &identity), repos::ordered(api.as_ref(), args.sort));
    let state = state?;

    let filters = args.feed.filters();
    let shown = feed::visible(&state, &filters);
    if let Some(idx) = args.feed.open {
        feed::open_at(&host, &shown, idx)?;
    }

    let _s = log.span(&FeedPhase::Render).entered();
    if telemetry::config::json_mode() {
        let out = DashboardView {
            feed: FeedView::new(&identity, &state, filters.enabled(), &shown),
            repos: list,
        };
        log.result(&out, Some(started))?;
    } else {
        print!("{}", view::header());
        print!("{}", view::render_feed(&state, &filters, identity.advisory.as_deref(), &feed::render_opts()));
        println!("\nTop Repositories");
        print!("{}", view::render_repos(&list.repos));
    }
    if let SyncState::Error { message, .. } = state {
        bail!(message);
    }
    Ok(())
}
