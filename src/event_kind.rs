use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Event types the client knows how to label, style and filter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Push,
    #[value(alias = "pr")]
    PullRequest,
    #[value(alias = "star")]
    Watch,
    Delete,
    Create,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeStyle {
    Push,
    PullRequest,
    Watch,
    Delete,
    Create,
    Outline,
}

#[derive(Copy, Clone, Debug)]
pub struct EventKindInfo {
    pub kind: EventKind,
    pub wire: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub badge: BadgeStyle,
    pub filterable: bool,
}

pub const EVENT_KINDS: [EventKindInfo; 5] = [
    EventKindInfo { kind: EventKind::Push, wire: "PushEvent", label: "Push", icon: "●", badge: BadgeStyle::Push, filterable: true },
    EventKindInfo { kind: EventKind::PullRequest, wire: "PullRequestEvent", label: "Pull Request", icon: "⇄", badge: BadgeStyle::PullRequest, filterable: true },
    EventKindInfo { kind: EventKind::Watch, wire: "WatchEvent", label: "Star", icon: "★", badge: BadgeStyle::Watch, filterable: true },
    EventKindInfo { kind: EventKind::Delete, wire: "DeleteEvent", label: "Delete", icon: "✕", badge: BadgeStyle::Delete, filterable: true },
    EventKindInfo { kind: EventKind::Create, wire: "CreateEvent", label: "Create", icon: "⑂", badge: BadgeStyle::Create, filterable: true },
];

/// Icon used for wire types outside the table.
pub const FALLBACK_ICON: &str = "●";

impl EventKind {
    pub fn info(self) -> &'static EventKindInfo {
        // table is indexed in declaration order
        &EVENT_KINDS[self as usize]
    }

    pub fn from_wire(s: &str) -> Option<EventKind> {
        EVENT_KINDS.iter().find(|i| i.wire == s).map(|i| i.kind)
    }

    pub fn filterable() -> impl Iterator<Item = EventKind> {
        EVENT_KINDS.iter().filter(|i| i.filterable).map(|i| i.kind)
    }
}

pub fn icon_for(wire: &str) -> &'static str {
    EventKind::from_wire(wire).map(|k| k.info().icon).unwrap_or(FALLBACK_ICON)
}

pub fn badge_for(wire: &str) -> BadgeStyle {
    EventKind::from_wire(wire).map(|k| k.info().badge).unwrap_or(BadgeStyle::Outline)
}
