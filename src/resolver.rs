//! # Read resolver
//!
//! For one target reference position and one alignment record, walks the
//! CIGAR to find the aligned base (if any), and applies read-level filters.
//! This is the **only** place reference-position arithmetic happens -- a
//! reimplementation of htslib's `cigar_resolve2`, same spirit as the teacher's
//! `utils::cigar`/`allele_length_from_cigar` walk, generalized from "how much
//! of a tandem repeat does this CIGAR span" to "what base lands on this exact
//! position" (SPEC_FULL.md §4.2, §9).
use crate::config::{CellTag, Config, UmiTag};
use crate::error::ResolveOutcome;
use crate::snv::base_index_from_u8;
use rust_htslib::bam::record::{Cigar, Record};

/// Transient, owned probe produced by a successful resolution. Strings are
/// copied out of the record immediately so nothing here can outlive the
/// iterator's next `.fetch()`/`.records()` advance (SPEC_FULL.md §9).
#[derive(Debug, Clone)]
pub struct ReadProbe {
    pub cell_barcode: Option<String>,
    pub umi: Option<String>,
    pub base_index: usize,
    pub base_quality: u8,
}

/// Resolve `record` against `pos` (0-based reference coordinate) under the
/// filters in `config`. Returns the resolved probe on `Ok`, or the outcome
/// that explains why nothing was produced.
pub fn resolve(
    record: &Record,
    pos: i64,
    config: &Config,
) -> Result<(ResolveOutcome, Option<ReadProbe>), crate::error::PileupError> {
    let umi = match config.umi_tag {
        UmiTag::Tag(tag) => match record.aux(&tag) {
            Ok(rust_htslib::bam::record::Aux::String(s)) => Some(s.to_string()),
            Ok(_) | Err(_) => return Ok((ResolveOutcome::Malformed, None)),
        },
        UmiTag::None => None,
    };

    // Only extract (and require) the cell tag when barcodes are actually in
    // use. In sample-ID/bulk mode `cell_tag` still defaults to `Tag(*b"CB")`
    // (SPEC_FULL.md §6), but groups are routed by `sid`, not by barcode, so a
    // record missing `CB` must not reject the read (SPEC_FULL.md §4.2 step 2).
    let cell_barcode = if config.uses_barcodes() {
        match config.cell_tag {
            CellTag::Tag(tag) => match record.aux(&tag) {
                Ok(rust_htslib::bam::record::Aux::String(s)) => Some(s.to_string()),
                Ok(_) | Err(_) => return Ok((ResolveOutcome::Malformed, None)),
            },
            CellTag::None => None,
        }
    } else {
        None
    };

    if record.mapq() < config.min_mapq || record.flags() > config.max_flag {
        return Ok((ResolveOutcome::Filtered, None));
    }

    let record_pos = record.pos();
    if record_pos > pos {
        // Precondition violated: the region iterator is supposed to only hand us
        // records that start at or before `pos`. Treat this as the fatal CIGAR
        // assertion failure described in SPEC_FULL.md §9, Open Question (a),
        // rather than silently dropping the read.
        return Err(crate::error::PileupError::CigarAssertion { record_pos, pos });
    }

    let mut ref_x = record_pos;
    let mut query_y: i64 = 0;
    let mut aligned_len: usize = 0;
    let mut hit: Option<(i64, i64)> = None; // (query_offset, _)
    let mut rejected = false;

    for op in record.cigar().iter() {
        if rejected {
            break;
        }
        let (consumes_ref, consumes_query, is_match) = match op {
            Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_) => (true, true, true),
            Cigar::Del(_) | Cigar::RefSkip(_) => (true, false, false),
            Cigar::Ins(_) | Cigar::SoftClip(_) => (false, true, false),
            _ => (false, false, false),
        };
        let op_len = i64::from(op.len());

        if hit.is_none() {
            let ref_x_prev = ref_x;
            let query_y_prev = query_y;
            let ref_x_next = if consumes_ref { ref_x + op_len } else { ref_x };

            if ref_x_next > pos {
                if is_match {
                    let query_offset = query_y_prev + (pos - ref_x_prev);
                    hit = Some((query_offset, 0));
                    if consumes_query {
                        aligned_len += op_len as usize;
                    }
                } else {
                    // D or N op spans the target position: deletion/refskip.
                    rejected = true;
                }
            } else if is_match {
                aligned_len += op_len as usize;
            }
        } else if consumes_query && is_match {
            aligned_len += op_len as usize;
        }

        if consumes_ref {
            ref_x += op_len;
        }
        if consumes_query {
            query_y += op_len;
        }
    }

    if rejected {
        return Ok((ResolveOutcome::Filtered, None));
    }

    let Some((query_offset, _)) = hit else {
        return Err(crate::error::PileupError::CigarAssertion {
            record_pos,
            pos,
        });
    };

    if aligned_len < config.min_len {
        return Ok((ResolveOutcome::Filtered, None));
    }

    let seq = record.seq().as_bytes();
    let qual = record.qual();
    let query_offset = query_offset as usize;
    if query_offset >= seq.len() {
        return Err(crate::error::PileupError::CigarAssertion { record_pos, pos });
    }
    let Some(base_index) = base_index_from_u8(seq[query_offset]) else {
        return Ok((ResolveOutcome::Filtered, None));
    };
    let base_quality = qual[query_offset];

    Ok((
        ResolveOutcome::Ok,
        Some(ReadProbe {
            cell_barcode,
            umi,
            base_index,
            base_quality,
        }),
    ))
}
