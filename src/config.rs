//! # Run configuration
//!
//! [`Config`] is an immutable value built once from parsed CLI arguments and
//! then shared by reference into every worker (SPEC_FULL.md §2.1, DESIGN NOTES
//! §9 -- the redesign away from the teacher's process-global settings).
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmiTag {
    None,
    Tag([u8; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    None,
    Tag([u8; 2]),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub alignment_files: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub snv_list: PathBuf,
    pub barcode_file: Option<PathBuf>,
    /// One-sample-ID-per-line file (alternative to `sample_ids`).
    pub sample_id_file: Option<PathBuf>,
    /// Sample IDs supplied directly as a CSV list on the command line.
    pub sample_ids: Option<Vec<String>>,
    pub threads: usize,
    pub cell_tag: CellTag,
    pub umi_tag: UmiTag,
    pub min_count: u32,
    pub min_maf: f64,
    pub double_gl: bool,
    pub min_len: usize,
    pub min_mapq: u8,
    pub max_flag: u16,
    pub genotype: bool,
    pub gzip: bool,
}

impl Config {
    pub fn uses_barcodes(&self) -> bool {
        self.barcode_file.is_some()
    }

    pub fn uses_umis(&self) -> bool {
        matches!(self.umi_tag, UmiTag::Tag(_))
    }
}

fn parse_tag(s: &str) -> [u8; 2] {
    let bytes = s.as_bytes();
    [bytes.first().copied().unwrap_or(b' '), bytes.get(1).copied().unwrap_or(b' ')]
}

pub fn cell_tag_from_opt(s: Option<&str>) -> CellTag {
    match s {
        None => CellTag::None,
        Some(s) if s.eq_ignore_ascii_case("none") => CellTag::None,
        Some(s) => CellTag::Tag(parse_tag(s)),
    }
}

/// `UMItag` accepts "Auto", which resolves to "UR" when barcodes are in use and
/// to "none" otherwise (SPEC_FULL.md §6).
pub fn umi_tag_from_opt(s: Option<&str>, uses_barcodes: bool) -> UmiTag {
    match s {
        None => UmiTag::None,
        Some(s) if s.eq_ignore_ascii_case("none") => UmiTag::None,
        Some(s) if s.eq_ignore_ascii_case("auto") => {
            if uses_barcodes {
                UmiTag::Tag(*b"UR")
            } else {
                UmiTag::None
            }
        }
        Some(s) => UmiTag::Tag(parse_tag(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn auto_umi_resolves_by_barcode_use() {
        assert_eq!(umi_tag_from_opt(Some("Auto"), true), UmiTag::Tag(*b"UR"));
        assert_eq!(umi_tag_from_opt(Some("Auto"), false), UmiTag::None);
    }

    #[test]
    fn explicit_none_disables_tag() {
        assert_eq!(cell_tag_from_opt(Some("None")), CellTag::None);
        assert_eq!(umi_tag_from_opt(Some("none"), true), UmiTag::None);
    }

    #[test]
    fn explicit_tag_parses() {
        assert_eq!(cell_tag_from_opt(Some("CB")), CellTag::Tag(*b"CB"));
    }
}
