//! # Single-nucleotide variants
//!
//! [`Snv`] is the immutable unit of work handed to the pileup engine: a single
//! reference position with a (possibly unknown) reference and alternate base.
use anyhow::{bail, Result};

/// The fixed base alphabet, indexed 0..4. `N` is index 4.
pub const N_BASES: usize = 5;
pub const BASE_CHARS: [u8; N_BASES] = [b'A', b'C', b'G', b'T', b'N'];

/// Map an alignment library base code to the fixed base index, if it is one
/// of A/C/G/T/N. `rust_htslib` decodes bases to their ASCII letters via
/// `Seq::encoded_base`/`decoded_base`; this maps that output onto our index.
pub fn base_index_from_u8(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        b'N' | b'n' => Some(4),
        _ => None,
    }
}

pub fn base_char(idx: usize) -> u8 {
    BASE_CHARS[idx]
}

/// A base identity as recorded in an SNV list: a concrete base, or "unknown"
/// (to be inferred from the observed pileup, see SPEC_FULL.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseId {
    Known(usize),
    Unknown,
}

impl BaseId {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "." | "" | "N" | "n" => Ok(BaseId::Unknown),
            _ => {
                let b = s.as_bytes().first().copied().unwrap_or(b'.');
                match base_index_from_u8(b) {
                    Some(idx) => Ok(BaseId::Known(idx)),
                    None => bail!("unrecognized base '{s}' in SNV list"),
                }
            }
        }
    }

    pub fn as_char(&self) -> u8 {
        match self {
            BaseId::Known(idx) => base_char(*idx),
            BaseId::Unknown => b'.',
        }
    }
}

/// A single candidate variant position, 0-based after loading (SPEC_FULL.md §3).
#[derive(Debug, Clone)]
pub struct Snv {
    pub chrom: String,
    pub pos: i64,
    pub reference: BaseId,
    pub alt: BaseId,
}

impl Snv {
    /// Construct a new SNV from 1-based input coordinates, converting to the
    /// internal 0-based representation. Rejects the case where both ref and alt
    /// are the same concrete base (SPEC_FULL.md §9, Open Question (c)).
    pub fn new(chrom: String, pos_1based: i64, reference: BaseId, alt: BaseId) -> Result<Self> {
        if let (BaseId::Known(r), BaseId::Known(a)) = (reference, alt) {
            if r == a {
                bail!(
                    "SNV {chrom}:{pos_1based} has identical REF and ALT ('{}'), which is config-invalid",
                    base_char(r) as char
                );
            }
        }
        Ok(Snv {
            chrom,
            pos: pos_1based - 1,
            reference,
            alt,
        })
    }

    pub fn pos_1based(&self) -> i64 {
        self.pos + 1
    }
}
