//! # Thread pool & driver
//!
//! The top-level orchestrator (SPEC_FULL.md §4.7, §5): loads the SNV list and
//! sample-group roster, partitions the SNV list into contiguous slices, runs
//! one [`Worker`] per slice on a dedicated `rayon::ThreadPool`, then merges
//! the resulting shards into the final matrix/VCF/samples outputs. Unlike the
//! teacher's `ConSTRain.rs`, which installs into the process-global rayon
//! pool, this driver builds its own pool per run so the crate stays safe to
//! call more than once in the same process (e.g. from the integration tests).
use crate::config::Config;
use crate::group::GroupRoster;
use crate::io;
use crate::output;
use crate::snv::Snv;
use crate::worker::{Worker, WorkerOutcome};
use anyhow::{bail, Context, Result};
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub snvs_considered: usize,
    pub snvs_emitted: u64,
    pub groups: usize,
}

/// Run the full pileup: load inputs, dispatch workers, merge shards, write
/// final outputs. Returns a small summary for the CLI's closing log line.
pub fn run(config: &Config) -> Result<RunSummary> {
    let start = Instant::now();
    info!("starting pileup run");

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("could not create output directory {}", config.out_dir.display()))?;

    let snvs = io::snv_list::load(&config.snv_list)?;
    let roster = build_roster(config)?;
    info!("{} candidate SNVs, {} sample groups", snvs.len(), roster.len());

    let scratch_dir = tempfile::Builder::new()
        .prefix(".cellsnip-shards-")
        .tempdir_in(&config.out_dir)
        .context("could not create scratch directory for worker shards")?;

    let threads = config.threads.max(1);
    let single_threaded = threads == 1;
    let slices = partition(&snvs, threads);

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("could not build worker thread pool")?;

    let results: Vec<(WorkerOutcome, output::ShardPaths)> = pool
        .install(|| -> Result<Vec<(WorkerOutcome, output::ShardPaths)>> {
            slices
                .par_iter()
                .enumerate()
                .map(|(slice_index, slice_ref)| -> Result<(WorkerOutcome, output::ShardPaths)> {
                    let slice: &[Snv] = slice_ref;
                    let worker = Worker::new(config, &roster, slice_index, scratch_dir.path(), single_threaded)
                        .with_context(|| format!("failed to start worker {slice_index}"))?;
                    let paths = worker.shard_paths().clone();
                    let outcome = worker.run(slice);
                    Ok((outcome, paths))
                })
                .collect()
        })?;

    if results.iter().any(|(outcome, _)| outcome.failed) {
        bail!("one or more workers failed; aborting (partial shards discarded)");
    }

    let rows: u64 = results.iter().map(|(o, _)| o.snv_count).sum();
    let nnz_ad: u64 = results.iter().map(|(o, _)| o.nr_ad).sum();
    let nnz_dp: u64 = results.iter().map(|(o, _)| o.nr_dp).sum();
    let nnz_oth: u64 = results.iter().map(|(o, _)| o.nr_oth).sum();
    let cols = roster.len() as u64;

    write_matrices(config, &results, single_threaded, rows, cols, nnz_ad, nnz_dp, nnz_oth)?;
    write_vcfs(config, &results, &roster)?;
    write_samples_tsv(config, &roster)?;

    info!(
        "finished in {:.2}s: {rows} SNVs emitted across {} groups",
        start.elapsed().as_secs_f64(),
        roster.len()
    );

    Ok(RunSummary {
        snvs_considered: snvs.len(),
        snvs_emitted: rows,
        groups: roster.len(),
    })
}

/// Build the sample-group roster from exactly one of `barcode_file` or
/// `sample_id_file`/`sample_ids` (SPEC_FULL.md §6).
fn build_roster(config: &Config) -> Result<GroupRoster> {
    if config.uses_barcodes() {
        let path = config
            .barcode_file
            .as_deref()
            .expect("uses_barcodes implies barcode_file is set");
        io::roster::load_barcodes(path)
    } else {
        let roster = io::roster::load_sample_ids(
            config.sample_id_file.as_deref(),
            config.sample_ids.as_deref(),
        )?;
        if roster.len() != config.alignment_files.len() {
            bail!(
                "{} sample IDs supplied but {} alignment files given; these must match 1:1 in order",
                roster.len(),
                config.alignment_files.len()
            );
        }
        Ok(roster)
    }
}

/// Partition `snvs` into at most `threads` contiguous slices of size
/// `ceil(N/threads)`; the last slice absorbs whatever remains.
fn partition(snvs: &[Snv], threads: usize) -> Vec<&[Snv]> {
    if snvs.is_empty() {
        return Vec::new();
    }
    let chunk_size = snvs.len().div_ceil(threads).max(1);
    snvs.chunks(chunk_size).collect()
}

#[allow(clippy::too_many_arguments)]
fn write_matrices(
    config: &Config,
    results: &[(WorkerOutcome, output::ShardPaths)],
    single_threaded: bool,
    rows: u64,
    cols: u64,
    nnz_ad: u64,
    nnz_dp: u64,
    nnz_oth: u64,
) -> Result<()> {
    let ad_path = config.out_dir.join("cellSNP.tag.AD.mtx");
    let dp_path = config.out_dir.join("cellSNP.tag.DP.mtx");
    let oth_path = config.out_dir.join("cellSNP.tag.OTH.mtx");

    if single_threaded && results.len() == 1 {
        // Fast path: the lone worker already wrote the preamble into its
        // shard; promote it in place and just inject the totals line.
        let (_, paths) = &results[0];
        fs::rename(&paths.ad, &ad_path).context("promoting AD shard to final matrix")?;
        fs::rename(&paths.dp, &dp_path).context("promoting DP shard to final matrix")?;
        fs::rename(&paths.oth, &oth_path).context("promoting OTH shard to final matrix")?;
        output::finalize_single_worker_mtx(&ad_path, rows, cols, nnz_ad)?;
        output::finalize_single_worker_mtx(&dp_path, rows, cols, nnz_dp)?;
        output::finalize_single_worker_mtx(&oth_path, rows, cols, nnz_oth)?;
        return Ok(());
    }

    let ad_shards: Vec<PathBuf> = results.iter().map(|(_, p)| p.ad.clone()).collect();
    let dp_shards: Vec<PathBuf> = results.iter().map(|(_, p)| p.dp.clone()).collect();
    let oth_shards: Vec<PathBuf> = results.iter().map(|(_, p)| p.oth.clone()).collect();

    for (path, shards, nnz) in [
        (&ad_path, &ad_shards, nnz_ad),
        (&dp_path, &dp_shards, nnz_dp),
        (&oth_path, &oth_shards, nnz_oth),
    ] {
        let mut writer = output::create_final(path, false)?;
        output::write_mtx_preamble(&mut writer)?;
        writeln!(writer, "{rows}\t{cols}\t{nnz}").context("writing matrix totals line")?;
        output::merge_mtx_shards(&mut writer, shards)?;
    }

    Ok(())
}

fn write_vcfs(
    config: &Config,
    results: &[(WorkerOutcome, output::ShardPaths)],
    roster: &GroupRoster,
) -> Result<()> {
    let base_name = if config.gzip { "cellSNP.base.vcf.gz" } else { "cellSNP.base.vcf" };
    let base_path = config.out_dir.join(base_name);
    let mut base_writer = output::create_final(&base_path, config.gzip)?;
    write_vcf_meta(&mut base_writer)?;
    writeln!(base_writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").context("writing base VCF header")?;
    let base_shards: Vec<PathBuf> = results.iter().map(|(_, p)| p.vcf_base.clone()).collect();
    output::merge_vcf_shards(&mut base_writer, &base_shards)?;

    if config.genotype {
        let cells_name = if config.gzip { "cellSNP.cells.vcf.gz" } else { "cellSNP.cells.vcf" };
        let cells_path = config.out_dir.join(cells_name);
        let mut cells_writer = output::create_final(&cells_path, config.gzip)?;
        write_vcf_meta(&mut cells_writer)?;
        write!(cells_writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT")
            .context("writing cells VCF header")?;
        for name in roster.names() {
            write!(cells_writer, "\t{name}").context("writing cells VCF sample column")?;
        }
        writeln!(cells_writer).context("terminating cells VCF header")?;

        let cells_shards: Vec<PathBuf> = results
            .iter()
            .filter_map(|(_, p)| p.vcf_cells.clone())
            .collect();
        output::merge_vcf_shards(&mut cells_writer, &cells_shards)?;
    }

    Ok(())
}

fn write_vcf_meta(writer: &mut impl std::io::Write) -> Result<()> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(writer, "##source=cellsnip")?;
    writeln!(writer, "##INFO=<ID=AD,Number=1,Type=Integer,Description=\"Alt allele depth\">")?;
    writeln!(writer, "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth at ref+alt\">")?;
    writeln!(writer, "##INFO=<ID=OTH,Number=1,Type=Integer,Description=\"Depth supporting neither ref nor alt\">")?;
    writeln!(writer, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">")?;
    writeln!(writer, "##FORMAT=<ID=AD,Number=1,Type=Integer,Description=\"Alt allele depth\">")?;
    writeln!(writer, "##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Total depth at ref+alt\">")?;
    writeln!(writer, "##FORMAT=<ID=OTH,Number=1,Type=Integer,Description=\"Depth supporting neither ref nor alt\">")?;
    writeln!(writer, "##FORMAT=<ID=PL,Number=G,Type=Float,Description=\"Phred-scaled genotype likelihoods\">")?;
    writeln!(writer, "##FORMAT=<ID=ALL,Number=5,Type=Integer,Description=\"Per-base totals, A,C,G,T,N order\">")?;
    Ok(())
}

fn write_samples_tsv(config: &Config, roster: &GroupRoster) -> Result<()> {
    let path = config.out_dir.join("cellSNP.samples.tsv");
    let mut writer = output::create_final(&path, false)?;
    for name in roster.names() {
        writeln!(writer, "{name}").context("writing samples.tsv row")?;
    }
    Ok(())
}
