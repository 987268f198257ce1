use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::types::Event;
use crate::event_kind::{badge_for, BadgeStyle, EventKind};
use crate::identity::ResolvedIdentity;
use crate::sync::SyncState;

/// One feed line as the client presents it.
#[derive(Serialize)]
pub struct EventRow<'a> {
    pub id: &'a str,
    /// absent for wire types the client has no entry for
    pub kind: Option<EventKind>,
    pub display_name: &'a str,
    pub avatar_url: &'a str,
    pub actor_url: String,
    pub badge: BadgeStyle,
    pub action: &'a str,
    pub repo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub url: &'a str,
}

impl<'a> From<&'a Event> for EventRow<'a> {
    fn from(ev: &'a Event) -> Self {
        EventRow {
            id: &ev.id,
            kind: ev.kind(),
            display_name: ev.display_name(),
            avatar_url: ev.avatar_url(),
            actor_url: ev.actor_url(),
            badge: badge_for(&ev.event_type),
            action: &ev.action,
            repo: &ev.repo.name,
            commit_message: ev.commit_message.as_deref(),
            created_at: ev.created_at,
            url: &ev.event_url,
        }
    }
}

/// Structured result of `gitcast feed`.
#[derive(Serialize)]
pub struct FeedView<'a> {
    pub identity: &'a ResolvedIdentity,
    /// lifecycle state; the ready snapshot is not repeated here
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
    pub filters: Vec<EventKind>,
    /// events left after filtering; empty unless the state is ready
    pub visible: Vec<EventRow<'a>>,
}

impl<'a> FeedView<'a> {
    pub fn new(identity: &'a ResolvedIdentity, state: &'a SyncState, filters: Vec<EventKind>, shown: &[&'a Event]) -> Self {
        let (error, from_cache) = match state {
            SyncState::Error { message, .. } => (Some(message.as_str()), None),
            SyncState::Ready { snapshot, .. } => (None, Some(snapshot.from_cache)),
            _ => (None, None),
        };
        FeedView {
            identity,
            state: state.name(),
            error,
            from_cache,
            filters,
            visible: shown.iter().map(|e| EventRow::from(*e)).collect(),
        }
    }
}
