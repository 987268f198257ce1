use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::api::types::Repository;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// server order
    #[default]
    None,
    /// most GitHub stars first
    Stars,
    /// most host-platform users first
    Farcaster,
}

/// Returns a sorted copy. `slice::sort_by` is stable, so equal keys keep
/// their source order.
pub fn sort_repositories(repos: &[Repository], mode: SortMode) -> Vec<Repository> {
    let mut out = repos.to_vec();
    match mode {
        SortMode::None => {}
        SortMode::Stars => out.sort_by(|a, b| b.stars_count.cmp(&a.stars_count)),
        SortMode::Farcaster => out.sort_by(|a, b| b.farcaster_stars_count.cmp(&a.farcaster_stars_count)),
    }
    out
}
