//! # Error taxonomy
//!
//! [`PileupError`] enumerates the outcomes the pileup engine needs to branch on
//! internally (resolver decisions, SNV-level rejections, worker failures). Code
//! above the engine boundary (CLI, loaders, driver setup) uses `anyhow::Result`
//! with `.context(..)`, same as the rest of the crate.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PileupError {
    #[error("missing required aux tag on record")]
    Malformed,

    #[error("read rejected by filter policy")]
    Filtered,

    #[error("unknown contig '{0}'")]
    ContigUnknown(String),

    #[error("CIGAR ended before reaching target position {pos} (record starts at {record_pos})")]
    CigarAssertion { record_pos: i64, pos: i64 },

    #[error("record has no cell barcode matching a known group")]
    UnknownCell,

    #[error("failed to read alignment record: {0}")]
    IoRead(#[from] rust_htslib::errors::Error),

    #[error("genotype likelihood computation failed: {0}")]
    NumericFailure(String),
}

/// Outcome of resolving a single alignment record against a target position.
/// Kept distinct from [`PileupError`] because `Filtered`/`Malformed` are expected,
/// silently-counted outcomes rather than error conditions -- see SPEC_FULL.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Ok,
    Malformed,
    Filtered,
}
