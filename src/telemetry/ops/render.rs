use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Render;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Gate, Load, Derive, Present }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Gate => "gate",
        Phase::Load => "load",
        Phase::Derive => "derive",
        Phase::Present => "present",
    }}
    fn span(&self) -> Span { match self {
        Phase::Gate => info_span!("gate"),
        Phase::Load => info_span!("load"),
        Phase::Derive => info_span!("derive"),
        Phase::Present => info_span!("present"),
    }}
}

impl OpMarker for Render {
    const NAME: &'static str = "render";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("render") }
}
