use serde::Serialize;

use crate::api::types::Repository;
use crate::sort::SortMode;

#[derive(Serialize)]
pub struct RepoList {
    pub sort: SortMode,
    /// false when the top-repos request failed and the list fell back to empty
    pub loaded: bool,
    pub repos: Vec<Repository>,
}
