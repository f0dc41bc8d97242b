//! # SNV list loading
//!
//! Candidate SNVs come from either a plain tab-delimited text file
//! (`CHROM POS REF ALT`, 1-based POS, `.` for unknown REF/ALT) or a VCF file,
//! following the teacher's `io/bed.rs` (plain-text, `csv`) and `io/vcf.rs`
//! (`rust_htslib::bcf`) split.
use crate::snv::{BaseId, Snv};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::info;
use rust_htslib::bcf::{Read, Reader};
use serde::Deserialize;
use std::path::Path;
use std::str;

#[derive(Debug, Deserialize)]
struct SnvRecord {
    chrom: String,
    pos: i64,
    reference: String,
    alt: String,
}

/// Load SNVs from `path`, dispatching on extension: `.vcf`/`.vcf.gz`/`.bcf`
/// use the VCF reader, anything else is treated as plain tab-delimited text.
pub fn load(path: &Path) -> Result<Vec<Snv>> {
    let is_vcf = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("vcf") | Some("gz") | Some("bcf")
    );

    let snvs = if is_vcf {
        load_vcf(path)?
    } else {
        load_text(path)?
    };

    info!("Read {} candidate SNVs from {}", snvs.len(), path.display());
    Ok(snvs)
}

fn load_text(path: &Path) -> Result<Vec<Snv>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("could not open SNV list {}", path.display()))?;

    let mut snvs = Vec::new();
    for result in reader.deserialize() {
        let record: SnvRecord =
            result.with_context(|| format!("failed to parse SNV list record in {}", path.display()))?;
        let reference = BaseId::from_str(&record.reference)?;
        let alt = BaseId::from_str(&record.alt)?;
        snvs.push(Snv::new(record.chrom, record.pos, reference, alt)?);
    }
    Ok(snvs)
}

fn load_vcf(path: &Path) -> Result<Vec<Snv>> {
    let mut bcf = Reader::from_path(path)
        .with_context(|| format!("failed to open VCF SNV list {}", path.display()))?;
    let header = bcf.header().to_owned();

    let mut snvs = Vec::new();
    for record in bcf.records() {
        let record = record.with_context(|| format!("error reading VCF record in {}", path.display()))?;
        let rid = record.rid().context("VCF record missing rid")?;
        let chrom = str::from_utf8(header.rid2name(rid)?)
            .context("non-UTF8 contig name in VCF")?
            .to_string();
        let pos_1based = record.pos() + 1;

        let alleles = record.alleles();
        let reference = match alleles.first() {
            Some(a) => BaseId::from_str(str::from_utf8(a)?)?,
            None => BaseId::Unknown,
        };
        let alt = match alleles.get(1) {
            Some(a) => BaseId::from_str(str::from_utf8(a)?)?,
            None => BaseId::Unknown,
        };

        snvs.push(Snv::new(chrom, pos_1based, reference, alt)?);
    }
    Ok(snvs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn loads_plain_text_snv_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t100\tA\tC").unwrap();
        writeln!(file, "chr2\t50\t.\t.").unwrap();
        let snvs = load_text(file.path()).unwrap();
        assert_eq!(snvs.len(), 2);
        assert_eq!(snvs[0].chrom, "chr1");
        assert_eq!(snvs[0].pos, 99);
        assert_eq!(snvs[0].reference, BaseId::Known(0));
        assert_eq!(snvs[1].reference, BaseId::Unknown);
    }
}
