use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRepo {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Host-platform profile attached to an event when the actor linked one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarcasterProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Raw wire type; unknown values are kept so filtering can exclude them.
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: DateTime<Utc>,
    pub actor: Actor,
    pub repo: EventRepo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<u64>,
    #[serde(default)]
    pub action: String,
    #[serde(rename = "commitMessage", default)]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farcaster: Option<FarcasterProfile>,
    #[serde(rename = "eventUrl", default)]
    pub event_url: String,
}

impl Event {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_wire(&self.event_type)
    }

    /// Linked display name first, GitHub login otherwise.
    pub fn display_name(&self) -> &str {
        self.farcaster
            .as_ref()
            .and_then(|f| f.display_name.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.actor.login.as_str())
    }

    pub fn avatar_url(&self) -> &str {
        self.farcaster
            .as_ref()
            .and_then(|f| f.pfp_url.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.actor.avatar_url.as_str())
    }

    pub fn actor_url(&self) -> String {
        format!("https://github.com/{}", self.actor.login)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub events: Vec<Event>,
    #[serde(rename = "fromCache", default)]
    pub from_cache: bool,
    #[serde(rename = "cacheAge", default)]
    pub cache_age: f64,
}

impl FeedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops events whose id was already seen, keeping server order.
    /// Returns how many were dropped.
    pub fn dedup_ids(&mut self) -> usize {
        let before = self.events.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(before);
        self.events.retain(|e| seen.insert(e.id.clone()));
        before - self.events.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingStats {
    #[serde(default)]
    pub events: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingStatus {
    #[serde(default)]
    pub stats: IndexingStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoId {
    Num(u64),
    Text(String),
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoId::Num(n) => write!(f, "{n}"),
            RepoId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stars_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub farcaster_stars_count: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TopReposResponse {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}
