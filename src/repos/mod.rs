use anyhow::{bail, Result};
use clap::Args;
use std::time::Instant;
use tracing::Instrument;

use crate::api::types::Repository;
use crate::api::FeedApi;
use crate::identity::HostPlatform;
use crate::sort::{sort_repositories, SortMode};
use crate::telemetry::{self};
use crate::telemetry::ops::repos::Phase as ReposPhase;
use crate::view;

pub mod types;

/// gitcast repos
#[derive(Args, Clone, Debug)]
pub struct ReposCmd {
    /// Order of the list; `none` keeps the server order
    #[arg(long, value_enum, default_value_t = SortMode::None)]
    pub sort: SortMode,
    /// Open the repository at this 1-based position in the browser
    #[arg(long)]
    pub open: Option<usize>,
}

/// Fetches the top repositories. A failed request is logged and leaves the
/// list empty; the second field tells the two apart.
pub async fn load(api: &dyn FeedApi) -> (Vec<Repository>, bool) {
    let log = telemetry::repos();
    match api.top_repos().instrument(log.span(&ReposPhase::Fetch)).await {
        Ok(repos) => {
            log.info_kv("top repos loaded", [("count", repos.len().to_string())]);
            (repos, true)
        }
        Err(err) => {
            log.warn_kv("top repos unavailable", [("error", err.to_string())]);
            (Vec::new(), false)
        }
    }
}

/// Loads and orders the list for display.
pub async fn ordered(api: &dyn FeedApi, mode: SortMode) -> types::RepoList {
    let (repos, loaded) = load(api).await;
    let log = telemetry::repos();
    let _s = log.span(&ReposPhase::Sort).entered();
    types::RepoList { sort: mode, loaded, repos: sort_repositories(&repos, mode) }
}

pub fn open_at(host: &dyn HostPlatform, repos: &[Repository], index: usize) -> Result<()> {
    let Some(repo) = index.checked_sub(1).and_then(|i| repos.get(i)) else {
        bail!("No repository at position {} ({} listed)", index, repos.len());
    };
    host.open_url(&repo.html_url)
}

pub async fn run(api: &dyn FeedApi, host: &dyn HostPlatform, args: ReposCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::repos();
    let span = log.root_span_kv([("sort", format!("{:?}", args.sort))]);
    let list = ordered(api, args.sort).instrument(span).await;

    if let Some(idx) = args.open {
        open_at(host, &list.repos, idx)?;
    }

    let _s = log.span(&ReposPhase::Render).entered();
    if telemetry::config::json_mode() {
        log.result(&list, Some(started))?;
    } else {
        print!("{}", view::render_repos(&list.repos));
    }
    Ok(())
}
