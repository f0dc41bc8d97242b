//! # Command line interface for `cellsnip`
//!
//! Argument parsing and configuration surface (out of core scope per
//! SPEC_FULL.md §1/§2.1); follows the teacher's `cli.rs` layout, collapsed to
//! a single command since this crate has one mode of operation (whole-genome
//! pileup without a SNV list is a stub, see [`Cli::into_config`]).
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{cell_tag_from_opt, umi_tag_from_opt, Config};

#[derive(Parser)]
#[command(
    name = "cellsnip",
    author,
    version,
    about = "Per-cell/per-sample allele counting pileup engine for SNV lists",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Indexed alignment file(s) to pileup (BAM/SAM/CRAM), comma-separated
    #[arg(short = 'i', long = "samFileList", value_delimiter = ',', required = true)]
    pub alignment_files: Vec<PathBuf>,

    /// Output directory; created if missing
    #[arg(short = 'o', long = "outDir")]
    pub out_dir: PathBuf,

    /// Candidate SNV list: plain tab-delimited text (CHROM POS REF ALT) or VCF
    #[arg(short = 'R', long = "regionsVCF")]
    pub snv_list: Option<PathBuf>,

    /// Whole-genome pileup by chromosome list, without a candidate SNV list.
    /// Not implemented -- supply --regionsVCF instead.
    #[arg(long = "chromList")]
    pub chrom_list: Option<String>,

    /// Cell barcode list, one per line (mutually exclusive with sample IDs)
    #[arg(short = 'b', long = "barcodeFile")]
    pub barcode_file: Option<PathBuf>,

    /// Sample-ID list file, one per line, in input-file order
    #[arg(short = 'I', long = "sampleList")]
    pub sample_list: Option<PathBuf>,

    /// Sample IDs as a comma-separated list (alternative to --sampleList)
    #[arg(short = 'S', long = "sampleIDs", value_delimiter = ',')]
    pub sample_ids: Option<Vec<String>>,

    /// Number of threads to use
    #[arg(short = 'p', long = "nproc", default_value_t = 1, value_parser = threads_in_range)]
    pub threads: usize,

    /// Cell barcode aux tag, or "None" to disable (sample-ID mode)
    #[arg(long = "cellTAG", default_value = "CB")]
    pub cell_tag: String,

    /// UMI aux tag: an explicit two-letter tag, "Auto", or "None"
    #[arg(long = "UMItag", default_value = "Auto")]
    pub umi_tag: String,

    /// Minimum total read count at a SNV to report it
    #[arg(long = "minCOUNT", default_value_t = 20)]
    pub min_count: u32,

    /// Minimum minor allele frequency at a SNV to report it
    #[arg(long = "minMAF", default_value_t = 0.0)]
    pub min_maf: f64,

    /// Also compute Phred-scaled genotype likelihoods
    #[arg(long = "genotype")]
    pub genotype: bool,

    /// With --genotype, also emit heterozygous dosage likelihoods at 0.5/1.5
    #[arg(long = "doubleGL")]
    pub double_gl: bool,

    /// Minimum aligned read length spanning the SNV
    #[arg(long = "minLEN", default_value_t = 30)]
    pub min_len: usize,

    /// Minimum read mapping quality
    #[arg(long = "minMAPQ", default_value_t = 20)]
    pub min_mapq: u8,

    /// Maximum read FLAG value
    #[arg(long = "maxFLAG", default_value_t = 255)]
    pub max_flag: u16,

    /// Gzip the final VCF outputs (matrices are never compressed)
    #[arg(long)]
    pub gzip: bool,
}

impl Cli {
    /// Validate the parsed arguments and build the immutable run [`Config`].
    /// This is where the mutually-exclusive-option and stub-mode checks live,
    /// matching the teacher's pattern of doing input validation in `cli.rs`
    /// rather than scattering it through the driver.
    pub fn into_config(self) -> Result<Config> {
        if self.chrom_list.is_some() {
            bail!(
                "whole-genome pileup by chromosome list (--chromList) is not implemented; \
                 supply --regionsVCF with a candidate SNV list instead"
            );
        }
        let Some(snv_list) = self.snv_list else {
            bail!("--regionsVCF is required (whole-genome pileup without a SNV list is not implemented)");
        };

        if self.alignment_files.is_empty() {
            bail!("at least one --samFileList entry is required");
        }

        let uses_barcodes = self.barcode_file.is_some();
        let uses_sample_ids = self.sample_list.is_some() || self.sample_ids.is_some();
        if uses_barcodes == uses_sample_ids {
            bail!("exactly one of --barcodeFile or --sampleList/--sampleIDs must be supplied");
        }

        let cell_tag = cell_tag_from_opt(Some(&self.cell_tag));
        let umi_tag = umi_tag_from_opt(Some(&self.umi_tag), uses_barcodes);

        Ok(Config {
            alignment_files: self.alignment_files,
            out_dir: self.out_dir,
            snv_list,
            barcode_file: self.barcode_file,
            sample_id_file: self.sample_list,
            sample_ids: self.sample_ids,
            threads: self.threads,
            cell_tag,
            umi_tag,
            min_count: self.min_count,
            min_maf: self.min_maf,
            double_gl: self.double_gl,
            min_len: self.min_len,
            min_mapq: self.min_mapq,
            max_flag: self.max_flag,
            genotype: self.genotype,
            gzip: self.gzip,
        })
    }
}

fn threads_in_range(s: &str) -> Result<usize> {
    let threads = s.parse().context("could not parse --nproc to an integer")?;
    if threads < 1 {
        bail!("--nproc must be at least 1");
    }
    Ok(threads)
}
