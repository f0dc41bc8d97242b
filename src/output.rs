//! # Output module
//!
//! Scoped file handles for worker shards and the driver's merged final
//! outputs, optional transparent gzip on the final VCFs, and the
//! rewrite-in-place helper used by the single-threaded fast path to patch the
//! matrix-market totals line after the fact (SPEC_FULL.md §4.7, §4.8).
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One worker's open shard files, named by its slice index (not OS thread id
/// -- see SPEC_FULL.md §4.7).
pub struct ShardWriters {
    pub ad: BufWriter<File>,
    pub dp: BufWriter<File>,
    pub oth: BufWriter<File>,
    pub vcf_base: BufWriter<File>,
    pub vcf_cells: Option<BufWriter<File>>,
    pub paths: ShardPaths,
}

#[derive(Debug, Clone)]
pub struct ShardPaths {
    pub ad: PathBuf,
    pub dp: PathBuf,
    pub oth: PathBuf,
    pub vcf_base: PathBuf,
    pub vcf_cells: Option<PathBuf>,
}

impl ShardWriters {
    /// Create one worker's shard files under `scratch_dir`. When `inline_preamble`
    /// is set (the single-threaded fast path, SPEC_FULL.md §4.7), the
    /// matrix-market preamble is written into each `.mtx` shard immediately, so
    /// the shard can later be promoted directly to the final file with only a
    /// totals-line injection rather than a full shard merge.
    pub fn create(
        scratch_dir: &Path,
        slice_index: usize,
        genotype: bool,
        inline_preamble: bool,
    ) -> Result<Self> {
        let ad = scratch_dir.join(format!("mtx_AD.{slice_index}"));
        let dp = scratch_dir.join(format!("mtx_DP.{slice_index}"));
        let oth = scratch_dir.join(format!("mtx_OTH.{slice_index}"));
        let vcf_base = scratch_dir.join(format!("vcf_base.{slice_index}"));
        let vcf_cells = genotype.then(|| scratch_dir.join(format!("vcf_cells.{slice_index}")));

        let mut ad_w = buffered_writer(&ad)?;
        let mut dp_w = buffered_writer(&dp)?;
        let mut oth_w = buffered_writer(&oth)?;
        let vcf_base_w = buffered_writer(&vcf_base)?;
        let vcf_cells_w = vcf_cells.as_ref().map(buffered_writer).transpose()?;

        if inline_preamble {
            write_mtx_preamble(&mut ad_w)?;
            write_mtx_preamble(&mut dp_w)?;
            write_mtx_preamble(&mut oth_w)?;
        }

        Ok(ShardWriters {
            ad: ad_w,
            dp: dp_w,
            oth: oth_w,
            vcf_base: vcf_base_w,
            vcf_cells: vcf_cells_w,
            paths: ShardPaths {
                ad,
                dp,
                oth,
                vcf_base,
                vcf_cells,
            },
        })
    }

    pub fn flush_all(&mut self) -> Result<()> {
        self.ad.flush().context("flushing AD shard")?;
        self.dp.flush().context("flushing DP shard")?;
        self.oth.flush().context("flushing OTH shard")?;
        self.vcf_base.flush().context("flushing base VCF shard")?;
        if let Some(w) = &mut self.vcf_cells {
            w.flush().context("flushing cells VCF shard")?;
        }
        Ok(())
    }
}

fn buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("could not create shard {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write a matrix-market sparse-matrix shard line: `col\tvalue` for a nonzero
/// entry. An SNV boundary is a single empty line, written separately.
pub fn write_mtx_entry(writer: &mut impl Write, col_1based: usize, value: u32) -> Result<()> {
    writeln!(writer, "{col_1based}\t{value}").context("writing matrix shard entry")
}

pub fn write_mtx_boundary(writer: &mut impl Write) -> Result<()> {
    writeln!(writer).context("writing matrix shard boundary")
}

/// Open a final output file, optionally wrapped in a transparent gzip
/// encoder. `gzip` only ever applies to final VCF outputs (SPEC_FULL.md §6).
pub fn create_final(path: &Path, gzip: bool) -> Result<Box<dyn Write>> {
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    if gzip {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// MatrixMarket "coordinate integer general" preamble, no totals line.
pub fn write_mtx_preamble(writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "%%MatrixMarket matrix coordinate integer general").context("writing mtx preamble")
}

/// Merge matrix shards (in worker/slice order) into `writer`, which already
/// has the preamble and totals line written. Assigns a globally monotonic
/// 1-based row index by tracking an empty-line-delimited SNV boundary count.
pub fn merge_mtx_shards(writer: &mut impl Write, shard_paths: &[PathBuf]) -> Result<()> {
    let mut row: u64 = 1;
    for path in shard_paths {
        let file = File::open(path).with_context(|| format!("could not open shard {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("could not read shard {}", path.display()))?;
            if line.is_empty() {
                row += 1;
            } else {
                writeln!(writer, "{row}\t{line}").context("writing merged matrix row")?;
            }
        }
    }
    Ok(())
}

/// Byte-concatenate VCF shards (in worker/slice order) onto `writer`, which
/// already has the fixed header written.
pub fn merge_vcf_shards(writer: &mut impl Write, shard_paths: &[PathBuf]) -> Result<()> {
    for path in shard_paths {
        let mut file = File::open(path).with_context(|| format!("could not open shard {}", path.display()))?;
        io::copy(&mut file, writer).with_context(|| format!("could not copy shard {}", path.display()))?;
    }
    Ok(())
}

/// Single-threaded fast path: the one worker already wrote a preamble
/// followed by boundary-delimited `col\tvalue` entries directly to `path`
/// (the same shard body format [`merge_mtx_shards`] consumes, just not yet
/// merged). Rewrite the file in place: inject the totals line after the
/// preamble, and number each entry's row by counting blank-line boundaries,
/// exactly as the multi-worker merge would have numbered it.
pub fn finalize_single_worker_mtx(path: &Path, rows: u64, cols: u64, nnz: u64) -> Result<()> {
    let tmp_path = path.with_extension("tmp-rewrite");
    {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("could not reopen {} to finalize", path.display()))?,
        );
        let mut writer = BufWriter::new(
            File::create(&tmp_path).with_context(|| format!("could not create {}", tmp_path.display()))?,
        );

        let mut lines = reader.lines();
        if let Some(preamble) = lines.next() {
            writeln!(writer, "{}", preamble?).context("copying preamble")?;
        }
        writeln!(writer, "{rows}\t{cols}\t{nnz}").context("writing totals line")?;

        let mut row: u64 = 1;
        for line in lines {
            let line = line.context("reading matrix body")?;
            if line.is_empty() {
                row += 1;
            } else {
                writeln!(writer, "{row}\t{line}").context("writing numbered matrix row")?;
            }
        }
        writer.flush().context("flushing rewritten matrix")?;
    }
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("could not replace {} with rewritten file", path.display()))?;
    Ok(())
}
