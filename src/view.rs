//! Plain-text rendering of the feed and repository views.

use chrono::{DateTime, Utc};

use crate::api::types::{Event, Repository};
use crate::event_kind::{badge_for, icon_for, BadgeStyle};
use crate::filter::FilterState;
use crate::sync::SyncState;
use crate::util::time::format_relative;

const TITLE: &str = "GitCast";
const TAGLINE: &str = "Merging GitHub into Farcaster";
const COMMIT_LINES: usize = 3;
const DESCRIPTION_LINES: usize = 2;

#[derive(Clone, Copy, Debug)]
pub struct RenderOpts {
    pub color: bool,
    pub now: DateTime<Utc>,
}

pub fn header() -> String {
    format!("{TITLE}\n{TAGLINE}\n")
}

fn paint(style: BadgeStyle, text: &str, color: bool) -> String {
    let code = match style {
        BadgeStyle::Push => "34",
        BadgeStyle::PullRequest => "35",
        BadgeStyle::Watch => "33",
        BadgeStyle::Delete => "31",
        BadgeStyle::Create => "32",
        BadgeStyle::Outline => return text.to_string(),
    };
    if color { format!("\x1b[{code}m{text}\x1b[0m") } else { text.to_string() }
}

fn indexing_card(progress: Option<&str>, come_back: bool) -> String {
    let mut out = String::from("Indexing Your Data\n");
    out.push_str("We're currently indexing your GitHub data. This process takes a minute to complete.\n");
    if let Some(p) = progress {
        out.push_str(p);
        out.push('\n');
    }
    if come_back {
        out.push_str("Please come back in a minute to see your feed!\n");
    }
    out
}

pub fn render_event(idx: usize, ev: &Event, opts: &RenderOpts) -> String {
    let badge = paint(badge_for(&ev.event_type), &format!("{} {}", icon_for(&ev.event_type), ev.action), opts.color);
    let mut out = format!("[{}] {}  {}\n", idx, ev.display_name(), badge);
    out.push_str(&format!("    {}  ({})\n", ev.repo.name, ev.actor_url()));
    if let Some(msg) = ev.commit_message.as_deref().filter(|m| !m.trim().is_empty()) {
        let lines: Vec<&str> = msg.lines().collect();
        for line in lines.iter().take(COMMIT_LINES) {
            out.push_str(&format!("    │ {}\n", line));
        }
        if lines.len() > COMMIT_LINES {
            out.push_str("    │ …\n");
        }
    }
    out.push_str(&format!("    {}\n", format_relative(ev.created_at, opts.now)));
    out
}

/// Renders whatever the sync machine currently holds.
pub fn render_feed(state: &SyncState, filters: &FilterState, advisory: Option<&str>, opts: &RenderOpts) -> String {
    let mut out = String::new();
    if let Some(a) = advisory {
        out.push_str(&format!("! {a}\n"));
    }
    match state {
        SyncState::Idle | SyncState::Loading { .. } => out.push_str("Loading feed…\n"),
        SyncState::Initializing { progress, .. } => {
            out.push_str(&indexing_card(progress.as_ref().map(|p| p.message.as_str()), false));
        }
        SyncState::Error { message, .. } => out.push_str(&format!("Error: {message}\n")),
        SyncState::Ready { snapshot, .. } if snapshot.is_empty() => {
            out.push_str(&indexing_card(None, true));
        }
        SyncState::Ready { snapshot, .. } => {
            let enabled = filters.enabled();
            if !enabled.is_empty() {
                let labels: Vec<&str> = enabled.iter().map(|k| k.info().label).collect();
                out.push_str(&format!("Filters: {}\n", labels.join(", ")));
            }
            let shown = filters.apply(&snapshot.events);
            if shown.is_empty() {
                out.push_str("No events match the selected filters.\n");
            }
            for (i, ev) in shown.iter().enumerate() {
                out.push_str(&render_event(i + 1, ev, opts));
            }
        }
    }
    out
}

pub fn render_repos(repos: &[Repository]) -> String {
    if repos.is_empty() {
        return "No repositories.\n".to_string();
    }
    let mut out = String::new();
    for (i, r) in repos.iter().enumerate() {
        out.push_str(&format!("[{}] {}  ({})\n", i + 1, r.name, r.full_name));
        let desc = r.description.as_deref().filter(|d| !d.trim().is_empty()).unwrap_or("No description");
        let lines: Vec<&str> = desc.lines().collect();
        for line in lines.iter().take(DESCRIPTION_LINES) {
            out.push_str(&format!("    {}\n", line));
        }
        if lines.len() > DESCRIPTION_LINES {
            out.push_str("    …\n");
        }
        let mut stats = format!("    ★ {}  ⑂ {}", thousands(r.stars_count), thousands(r.forks_count));
        if r.farcaster_stars_count > 0 {
            let noun = if r.farcaster_stars_count == 1 { "user" } else { "users" };
            stats.push_str(&format!("  · {} Farcaster {}", r.farcaster_stars_count, noun));
        }
        out.push_str(&stats);
        out.push('\n');
    }
    out
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
