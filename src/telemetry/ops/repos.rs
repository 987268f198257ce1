use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Repos;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Fetch, Sort, Render }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Fetch => "fetch", Phase::Sort => "sort", Phase::Render => "render" } }
    fn span(&self) -> Span { match self { Phase::Fetch => info_span!("fetch"), Phase::Sort => info_span!("sort"), Phase::Render => info_span!("render") } }
}

impl OpMarker for Repos {
    const NAME: &'static str = "repos";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("repos") }
}
