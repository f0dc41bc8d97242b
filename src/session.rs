//! # Alignment session
//!
//! Owns one open indexed alignment file (BAM/SAM/CRAM) and its index for the
//! lifetime of a worker. Unlike the teacher, which reimplements private
//! `rust_htslib` FFI entry points to route around a CRAM `Drop` bug, this
//! session uses the safe `rust_htslib::bam::IndexedReader` API directly --
//! see DESIGN.md for the tradeoff.
use anyhow::{anyhow, Context, Result};
use rust_htslib::bam::{self, Read};
use std::path::Path;

pub struct AlignmentSession {
    reader: bam::IndexedReader,
}

impl AlignmentSession {
    pub fn open<P: AsRef<Path>>(path: P, reference: Option<&Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = bam::IndexedReader::from_path(path)
            .with_context(|| format!("failed to open indexed alignment file {}", path.display()))?;

        if let Some(reference) = reference {
            reader
                .set_reference(reference)
                .with_context(|| format!("failed to set CRAM reference {}", reference.display()))?;
        }

        Ok(AlignmentSession { reader })
    }

    /// Resolve a chromosome name to its numeric target id via the header.
    pub fn tid_of(&self, chrom: &str) -> Result<u32> {
        self.reader
            .header()
            .tid(chrom.as_bytes())
            .ok_or_else(|| anyhow!("unknown contig '{chrom}'"))
    }

    /// Fetch reads covering the half-open region `[start, end)` on `tid`, and
    /// return an iterator of record results. Callers must not hold on to the
    /// previous iterator's records past this call (see `resolver.rs`).
    pub fn fetch(&mut self, tid: u32, start: i64, end: i64) -> Result<()> {
        self.reader
            .fetch((tid, start, end))
            .with_context(|| format!("failed to fetch region tid={tid}:{start}-{end}"))?;
        Ok(())
    }

    pub fn records(&mut self) -> bam::Records<'_, bam::IndexedReader> {
        self.reader.records()
    }
}
