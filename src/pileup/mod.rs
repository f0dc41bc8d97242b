//! Per-group and multi-group pileup aggregation (SPEC_FULL.md §4.3, §4.4).
pub mod mplp;
pub mod plp;

pub use mplp::{Mplp, PushOutcome};
pub use plp::Plp;
