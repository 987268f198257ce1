use std::collections::BTreeMap;

use serde::Serialize;

use crate::api::types::Event;
use crate::event_kind::EventKind;

/// Multi-select event-type toggles. Every flag starts disabled, which means
/// the feed is unfiltered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterState {
    flags: BTreeMap<EventKind, bool>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self { flags: EventKind::filterable().map(|k| (k, false)).collect() }
    }
}

impl FilterState {
    pub fn new() -> Self { Self::default() }

    /// Builds a state with each listed kind toggled once, so a kind listed
    /// twice ends up disabled again.
    pub fn from_toggles<I: IntoIterator<Item = EventKind>>(kinds: I) -> Self {
        let mut state = Self::new();
        for k in kinds { state.toggle(k); }
        state
    }

    pub fn toggle(&mut self, kind: EventKind) {
        let flag = self.flags.entry(kind).or_insert(false);
        *flag = !*flag;
    }

    pub fn is_enabled(&self, kind: EventKind) -> bool {
        self.flags.get(&kind).copied().unwrap_or(false)
    }

    pub fn any_active(&self) -> bool {
        self.flags.values().any(|v| *v)
    }

    pub fn enabled(&self) -> Vec<EventKind> {
        self.flags.iter().filter(|(_, v)| **v).map(|(k, _)| *k).collect()
    }

    /// With no active flag everything passes; otherwise only enabled kinds.
    /// Unrecognized wire types never match an active filter.
    pub fn predicate(&self, event: &Event) -> bool {
        if !self.any_active() {
            return true;
        }
        event.kind().is_some_and(|k| self.is_enabled(k))
    }

    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|e| self.predicate(e)).collect()
    }
}
