//! # Sample-group roster loading
//!
//! Exactly one of a barcode list or a sample-ID list/CSV is supplied
//! (SPEC_FULL.md §6). Barcodes are sorted lexicographically after load;
//! sample IDs keep file order, since that order must line up 1:1 with the
//! input alignment files.
use crate::group::GroupRoster;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

pub fn load_barcodes(path: &Path) -> Result<GroupRoster> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("could not read barcode file {}", path.display()))?;
    let mut names: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    names.sort_unstable();
    Ok(GroupRoster::from_names(names))
}

/// `sample_ids`, if already supplied on the CLI (a CSV list), is used verbatim.
/// Otherwise `path` is read as a one-sample-ID-per-line file.
pub fn load_sample_ids(path: Option<&Path>, sample_ids: Option<&[String]>) -> Result<GroupRoster> {
    if let Some(ids) = sample_ids {
        return Ok(GroupRoster::from_names(ids.to_vec()));
    }
    let Some(path) = path else {
        bail!("no sample IDs supplied: need either a sample-ID file or a sample-ID CSV list");
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("could not read sample-ID file {}", path.display()))?;
    let names: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    Ok(GroupRoster::from_names(names))
}
