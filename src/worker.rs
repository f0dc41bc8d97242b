//! # Worker
//!
//! Runs the SNV pileup procedure (SPEC_FULL.md §4.6) over one contiguous
//! slice of the SNV list, writing its own shard files. One `Worker` is built
//! per slice and owns every mutable resource it touches -- alignment
//! sessions, the reused `Mplp`, and its shard writers -- so no locking is
//! needed across workers (SPEC_FULL.md §5).
use crate::config::Config;
use crate::group::GroupRoster;
use crate::output::{write_mtx_boundary, write_mtx_entry, ShardPaths, ShardWriters};
use crate::pileup::{Mplp, PushOutcome};
use crate::resolver;
use crate::session::AlignmentSession;
use crate::snv::{base_char, Snv};
use anyhow::{Context, Result};
use log::{debug, error, trace};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default)]
pub struct WorkerOutcome {
    pub snv_count: u64,
    pub nr_ad: u64,
    pub nr_dp: u64,
    pub nr_oth: u64,
    pub failed: bool,
}

pub struct Worker<'a> {
    config: &'a Config,
    slice_index: usize,
    sessions: Vec<AlignmentSession>,
    mplp: Mplp,
    shards: ShardWriters,
    nr_ad_total: u64,
    nr_dp_total: u64,
    nr_oth_total: u64,
}

impl<'a> Worker<'a> {
    pub fn new(
        config: &'a Config,
        roster: &GroupRoster,
        slice_index: usize,
        scratch_dir: &Path,
        inline_preamble: bool,
    ) -> Result<Self> {
        let mut sessions = Vec::with_capacity(config.alignment_files.len());
        for path in &config.alignment_files {
            let session = AlignmentSession::open(path, None)
                .with_context(|| format!("worker {slice_index}: failed to open {}", path.display()))?;
            sessions.push(session);
        }

        let mplp = Mplp::new(roster);
        let shards = ShardWriters::create(scratch_dir, slice_index, config.genotype, inline_preamble)?;

        Ok(Worker {
            config,
            slice_index,
            sessions,
            mplp,
            shards,
            nr_ad_total: 0,
            nr_dp_total: 0,
            nr_oth_total: 0,
        })
    }

    pub fn shard_paths(&self) -> &ShardPaths {
        &self.shards.paths
    }

    /// Process every SNV in `slice`, writing emitted rows to this worker's
    /// shards. Returns the accumulated per-worker totals, or records a
    /// failure if a non-recoverable error occurred partway through.
    pub fn run(mut self, slice: &[Snv]) -> WorkerOutcome {
        trace!("worker {}: launched on {} SNVs", self.slice_index, slice.len());
        let mut outcome = WorkerOutcome::default();

        for snv in slice {
            match self.process_one(snv) {
                Ok(true) => outcome.snv_count += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("worker {}: non-recoverable error at {}:{}: {e:?}", self.slice_index, snv.chrom, snv.pos_1based());
                    outcome.failed = true;
                    break;
                }
            }
        }

        outcome.nr_ad = self.nr_ad_total;
        outcome.nr_dp = self.nr_dp_total;
        outcome.nr_oth = self.nr_oth_total;

        if let Err(e) = self.shards.flush_all() {
            error!("worker {}: failed to flush shards: {e:?}", self.slice_index);
            outcome.failed = true;
        }

        trace!("worker {}: finished, emitted {} rows", self.slice_index, outcome.snv_count);
        outcome
    }

    /// Process a single SNV. Returns `Ok(true)` if a row was emitted,
    /// `Ok(false)` if the SNV was rejected (nothing emitted), `Err` if a
    /// non-recoverable error occurred (the worker must abort).
    fn process_one(&mut self, snv: &Snv) -> Result<bool> {
        self.mplp.begin_snv(snv);

        let mut total_pushed: u32 = 0;
        for (sid, session) in self.sessions.iter_mut().enumerate() {
            let Ok(tid) = session.tid_of(&snv.chrom) else {
                debug!("unknown contig '{}' for session {sid}, skipping SNV", snv.chrom);
                continue;
            };
            session.fetch(tid, snv.pos, snv.pos + 1)?;

            let mut records = session.records();
            while let Some(record) = records.next() {
                let record = record.context("failed to read alignment record")?;
                match resolver::resolve(&record, snv.pos, self.config) {
                    Ok((crate::error::ResolveOutcome::Ok, Some(probe))) => {
                        match self.mplp.push(&probe, sid, self.config.uses_barcodes()) {
                            PushOutcome::Counted => total_pushed += 1,
                            PushOutcome::DuplicateUmi | PushOutcome::UnknownCell => {}
                        }
                    }
                    Ok((crate::error::ResolveOutcome::Ok, None)) => unreachable!("resolve Ok always carries a probe"),
                    Ok((crate::error::ResolveOutcome::Malformed, _)) => {}
                    Ok((crate::error::ResolveOutcome::Filtered, _)) => {}
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!("resolver error at {}:{}", snv.chrom, snv.pos_1based())
                        })
                    }
                }
            }
            drop(records);
        }

        if total_pushed < self.config.min_count {
            self.mplp.reset();
            return Ok(false);
        }

        if !self.mplp.stat(self.config) {
            self.mplp.reset();
            return Ok(false);
        }

        self.emit(snv)?;
        self.record_nr_totals();
        self.mplp.reset();
        Ok(true)
    }

    fn emit(&mut self, snv: &Snv) -> Result<()> {
        let ref_idx = self.mplp.ref_idx.expect("stat() fills ref_idx");
        let alt_idx = self.mplp.alt_idx.expect("stat() fills alt_idx");

        for (idx, plp) in self.mplp.groups.values().enumerate() {
            let col = idx + 1;
            if plp.ad > 0 {
                write_mtx_entry(&mut self.shards.ad, col, plp.ad)?;
            }
            if plp.dp > 0 {
                write_mtx_entry(&mut self.shards.dp, col, plp.dp)?;
            }
            if plp.oth > 0 {
                write_mtx_entry(&mut self.shards.oth, col, plp.oth)?;
            }
        }
        write_mtx_boundary(&mut self.shards.ad)?;
        write_mtx_boundary(&mut self.shards.dp)?;
        write_mtx_boundary(&mut self.shards.oth)?;

        let ref_char = base_char(ref_idx) as char;
        let alt_char = base_char(alt_idx) as char;
        writeln!(
            self.shards.vcf_base,
            "{}\t{}\t.\t{}\t{}\t.\tPASS\tAD={};DP={};OTH={}",
            snv.chrom,
            snv.pos_1based(),
            ref_char,
            alt_char,
            self.mplp.bc[alt_idx],
            self.mplp.bc[ref_idx] + self.mplp.bc[alt_idx],
            self.mplp.tc - (self.mplp.bc[ref_idx] + self.mplp.bc[alt_idx]),
        )
        .context("writing base VCF shard row")?;

        if let Some(cells) = &mut self.shards.vcf_cells {
            write!(
                cells,
                "{}\t{}\t.\t{}\t{}\t.\tPASS\tGT:AD:DP:OTH:PL:ALL",
                snv.chrom, snv.pos_1based(), ref_char, alt_char
            )
            .context("writing cells VCF shard prefix")?;

            for plp in self.mplp.groups.values() {
                let gt = genotype_call(&plp.gl);
                let pl: Vec<String> = plp.gl.iter().map(|v| format!("{v:.2}")).collect();
                let all: Vec<String> = plp.base_counts.iter().map(u32::to_string).collect();
                write!(
                    cells,
                    "\t{gt}:{}:{}:{}:{}:{}",
                    plp.ad,
                    plp.dp,
                    plp.oth,
                    pl.join(","),
                    all.join(","),
                )
                .context("writing cells VCF shard sample field")?;
            }
            writeln!(cells).context("terminating cells VCF shard row")?;
        }

        Ok(())
    }

    fn record_nr_totals(&mut self) {
        self.nr_ad_total += self.mplp.nr_ad as u64;
        self.nr_dp_total += self.mplp.nr_dp as u64;
        self.nr_oth_total += self.mplp.nr_oth as u64;
    }
}

fn genotype_call(gl: &[f64]) -> &'static str {
    if gl.len() < 3 {
        return "./.";
    }
    let mut best = 0;
    for i in 1..3 {
        if gl[i] < gl[best] {
            best = i;
        }
    }
    match best {
        0 => "0/0",
        1 => "0/1",
        _ => "1/1",
    }
}
