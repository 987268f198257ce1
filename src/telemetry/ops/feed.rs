use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Feed;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Identity, Fetch, Init, Poll, Refetch, Render }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Identity => "identity",
            Phase::Fetch => "fetch",
            Phase::Init => "init",
            Phase::Poll => "poll",
            Phase::Refetch => "refetch",
            Phase::Render => "render",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Identity => info_span!("identity"),
            Phase::Fetch => info_span!("fetch"),
            Phase::Init => info_span!("init"),
            Phase::Poll => info_span!("poll"),
            Phase::Refetch => info_span!("refetch"),
            Phase::Render => info_span!("render"),
        }
    }
}

impl OpMarker for Feed {
    const NAME: &'static str = "feed";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("feed") }
}
