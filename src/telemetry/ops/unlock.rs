use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Unlock;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Verify, Persist }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Verify => "verify",
        Phase::Persist => "persist",
    }}
    fn span(&self) -> Span { match self {
        Phase::Verify => info_span!("verify"),
        Phase::Persist => info_span!("persist"),
    }}
}

impl OpMarker for Unlock {
    const NAME: &'static str = "unlock";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("unlock") }
}
