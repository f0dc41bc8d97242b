//! # Multi-group pileup aggregator
//!
//! [`Mplp`] holds one [`Plp`] per sample group (cell or bulk library) and
//! aggregates them into a single SNV-level call: coverage filter, allele
//! inference, minor-allele-frequency filter, and (when genotyping is
//! enabled) per-group genotype likelihoods (SPEC_FULL.md §4.4, §4.5).
use crate::config::Config;
use crate::geno;
use crate::group::GroupRoster;
use crate::pileup::plp::Plp;
use crate::resolver::ReadProbe;
use crate::snv::{BaseId, Snv, N_BASES};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Counted,
    DuplicateUmi,
    UnknownCell,
}

#[derive(Debug)]
pub struct Mplp {
    pub groups: IndexMap<String, Plp>,
    pub bc: [u32; N_BASES],
    pub tc: u32,
    pub ref_idx: Option<usize>,
    pub alt_idx: Option<usize>,
    pub inf_rid: usize,
    pub inf_aid: usize,
    pub nr_ad: usize,
    pub nr_dp: usize,
    pub nr_oth: usize,
}

impl Mplp {
    pub fn new(roster: &GroupRoster) -> Self {
        let mut groups = IndexMap::with_capacity(roster.len());
        for name in roster.names() {
            groups.insert(name.to_string(), Plp::new());
        }
        Mplp {
            groups,
            bc: [0; N_BASES],
            tc: 0,
            ref_idx: None,
            alt_idx: None,
            inf_rid: 0,
            inf_aid: 0,
            nr_ad: 0,
            nr_dp: 0,
            nr_oth: 0,
        }
    }

    /// Load the SNV's (possibly unknown) ref/alt ahead of pushing reads for it.
    pub fn begin_snv(&mut self, snv: &Snv) {
        self.ref_idx = match snv.reference {
            BaseId::Known(idx) => Some(idx),
            BaseId::Unknown => None,
        };
        self.alt_idx = match snv.alt {
            BaseId::Known(idx) => Some(idx),
            BaseId::Unknown => None,
        };
    }

    /// Route a resolved probe to its group and push it.
    ///
    /// If barcodes are used, routes by `probe.cell_barcode`; an unrecognized
    /// barcode is silently dropped (`UnknownCell`), not an error. Otherwise
    /// routes by `sid`, the 0-based index of the alignment file the read came
    /// from (SPEC_FULL.md §4.4).
    pub fn push(&mut self, probe: &ReadProbe, sid: usize, uses_barcodes: bool) -> PushOutcome {
        let plp = if uses_barcodes {
            let Some(barcode) = probe.cell_barcode.as_deref() else {
                return PushOutcome::UnknownCell;
            };
            match self.groups.get_mut(barcode) {
                Some(plp) => plp,
                None => return PushOutcome::UnknownCell,
            }
        } else {
            match self.groups.get_index_mut(sid) {
                Some((_, plp)) => plp,
                None => return PushOutcome::UnknownCell,
            }
        };

        if plp.push(probe) {
            PushOutcome::Counted
        } else {
            PushOutcome::DuplicateUmi
        }
    }

    /// Finalize the SNV: totals, coverage filter, allele inference, MAF
    /// filter, and (if `config.genotype`) per-group genotype likelihoods.
    /// Returns `false` if the SNV should be rejected (no row emitted).
    pub fn stat(&mut self, config: &Config) -> bool {
        self.bc = [0; N_BASES];
        for plp in self.groups.values() {
            for i in 0..N_BASES {
                self.bc[i] += plp.base_counts[i];
            }
        }
        self.tc = self.bc.iter().sum();

        if self.tc < config.min_count {
            return false;
        }

        if self.ref_idx.is_none() || self.alt_idx.is_none() {
            let (rid, aid) = infer_allele(&self.bc);
            self.inf_rid = rid;
            self.inf_aid = aid;
            self.ref_idx.get_or_insert(rid);
            self.alt_idx.get_or_insert(aid);
        }

        let ref_idx = self.ref_idx.expect("ref_idx set above");
        let alt_idx = self.alt_idx.expect("alt_idx set above");

        if (self.bc[alt_idx] as f64) < self.tc as f64 * config.min_maf {
            return false;
        }

        self.nr_ad = 0;
        self.nr_dp = 0;
        self.nr_oth = 0;

        for plp in self.groups.values_mut() {
            plp.tc = plp.base_counts.iter().sum();
            plp.ad = plp.base_counts[alt_idx];
            plp.dp = plp.base_counts[ref_idx] + plp.base_counts[alt_idx];
            plp.oth = plp.tc - plp.dp;

            if plp.ad > 0 {
                self.nr_ad += 1;
            }
            if plp.dp > 0 {
                self.nr_dp += 1;
            }
            if plp.oth > 0 {
                self.nr_oth += 1;
            }

            if config.genotype {
                plp.quality_matrix = [[0.0; 4]; N_BASES];
                for base in 0..N_BASES {
                    let mut acc = [0.0; 4];
                    for &qual in &plp.quality_lists[base] {
                        let mut v = [0.0; 4];
                        geno::get_qual_vector(qual, 45, 0.25, &mut v);
                        for i in 0..4 {
                            acc[i] += v[i];
                        }
                    }
                    plp.quality_matrix[base] = acc;
                }
                geno::qual_matrix_to_geno(
                    &plp.quality_matrix,
                    &plp.base_counts,
                    ref_idx,
                    alt_idx,
                    config.double_gl,
                    &mut plp.gl,
                    &mut plp.n_gl,
                );
            }
        }

        true
    }

    /// Reset all dynamic state between SNVs. Does not touch `groups`' keys.
    pub fn reset(&mut self) {
        for plp in self.groups.values_mut() {
            plp.reset();
        }
        self.bc = [0; N_BASES];
        self.tc = 0;
        self.ref_idx = None;
        self.alt_idx = None;
        self.inf_rid = 0;
        self.inf_aid = 0;
        self.nr_ad = 0;
        self.nr_dp = 0;
        self.nr_oth = 0;
    }
}

/// `inf_rid` = argmax of `bc`, `inf_aid` = second-largest, ties broken by
/// lower base index. `N` (index 4) only enters the candidate set when no
/// A/C/G/T base has nonzero count; if every count (including N) is zero,
/// there is no information to infer from and both indices are `N`
/// (SPEC_FULL.md §4.5, §9 worked examples).
pub fn infer_allele(bc: &[u32; N_BASES]) -> (usize, usize) {
    let total: u32 = bc.iter().sum();
    if total == 0 {
        return (4, 4);
    }

    let acgt_sum: u32 = bc[0..4].iter().sum();
    let n_candidates = if acgt_sum == 0 { 5 } else { 4 };

    let mut rid = 0;
    for i in 1..n_candidates {
        if bc[i] > bc[rid] {
            rid = i;
        }
    }

    let mut aid = if rid == 0 { 1 } else { 0 };
    for i in 0..n_candidates {
        if i == rid {
            continue;
        }
        if bc[i] > bc[aid] {
            aid = i;
        }
    }

    (rid, aid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn infer_allele_worked_examples() {
        assert_eq!(infer_allele(&[0, 0, 0, 0, 0]), (4, 4));
        assert_eq!(infer_allele(&[10, 0, 5, 0, 0]), (0, 2));
        assert_eq!(infer_allele(&[5, 5, 0, 0, 0]), (0, 1));
        assert_eq!(infer_allele(&[0, 0, 5, 5, 0]), (2, 3));
    }

    fn roster() -> GroupRoster {
        GroupRoster::from_names(vec!["cellA".into(), "cellB".into()])
    }

    fn probe(base_index: usize, qual: u8, barcode: Option<&str>, umi: Option<&str>) -> ReadProbe {
        ReadProbe {
            cell_barcode: barcode.map(String::from),
            umi: umi.map(String::from),
            base_index,
            base_quality: qual,
        }
    }

    fn base_config() -> Config {
        Config {
            alignment_files: vec![],
            out_dir: std::path::PathBuf::new(),
            snv_list: std::path::PathBuf::new(),
            barcode_file: None,
            sample_id_file: None,
            sample_ids: None,
            threads: 1,
            cell_tag: crate::config::CellTag::Tag(*b"CB"),
            umi_tag: crate::config::UmiTag::None,
            min_count: 1,
            min_maf: 0.0,
            double_gl: false,
            min_len: 1,
            min_mapq: 0,
            max_flag: 255,
            genotype: false,
            gzip: false,
        }
    }

    #[test]
    fn push_routes_by_barcode_and_rejects_unknown() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);

        let outcome = mplp.push(&probe(0, 30, Some("cellA"), None), 0, true);
        assert_eq!(outcome, PushOutcome::Counted);
        assert_eq!(mplp.groups["cellA"].base_counts[0], 1);

        let outcome = mplp.push(&probe(0, 30, Some("cellZ"), None), 0, true);
        assert_eq!(outcome, PushOutcome::UnknownCell);
    }

    #[test]
    fn push_routes_by_sample_index_without_barcodes() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);

        mplp.push(&probe(1, 30, None, None), 1, false);
        assert_eq!(mplp.groups["cellB"].base_counts[1], 1);
    }

    #[test]
    fn stat_rejects_below_min_count() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);
        mplp.push(&probe(0, 30, Some("cellA"), None), 0, true);

        let mut config = base_config();
        config.min_count = 5;
        assert!(!mplp.stat(&config));
    }

    #[test]
    fn stat_rejects_below_min_maf() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);
        for _ in 0..100 {
            mplp.push(&probe(0, 30, Some("cellA"), None), 0, true);
        }
        mplp.push(&probe(1, 30, Some("cellA"), None), 0, true);

        let mut config = base_config();
        config.min_maf = 0.05;
        assert!(!mplp.stat(&config));
    }

    #[test]
    fn stat_fills_derived_fields_on_success() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);
        mplp.push(&probe(0, 30, Some("cellA"), None), 0, true);
        mplp.push(&probe(1, 30, Some("cellA"), None), 0, true);

        let config = base_config();
        assert!(mplp.stat(&config));
        assert_eq!(mplp.tc, 2);
        assert_eq!(mplp.groups["cellA"].dp, 2);
        assert_eq!(mplp.groups["cellA"].ad, 1);
        assert_eq!(mplp.nr_dp, 1);
    }

    #[test]
    fn reset_clears_dynamic_state_but_keeps_groups() {
        let mut mplp = Mplp::new(&roster());
        let snv = Snv::new("chr1".into(), 101, BaseId::Known(0), BaseId::Known(1)).unwrap();
        mplp.begin_snv(&snv);
        mplp.push(&probe(0, 30, Some("cellA"), None), 0, true);
        mplp.stat(&base_config());

        mplp.reset();
        assert_eq!(mplp.tc, 0);
        assert_eq!(mplp.bc, [0; N_BASES]);
        assert_eq!(mplp.groups.len(), 2);
        assert_eq!(mplp.groups["cellA"].base_counts[0], 0);
    }
}
