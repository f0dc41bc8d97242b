//! # Per-group pileup aggregator
//!
//! [`Plp`] accumulates base counts, quality lists, and UMI dedup state for a
//! single sample group at a single SNV (SPEC_FULL.md §4.3).
use crate::resolver::ReadProbe;
use crate::snv::N_BASES;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Plp {
    pub base_counts: [u32; N_BASES],
    pub quality_lists: [Vec<u8>; N_BASES],
    pub umi_seen: HashSet<String>,
    pub quality_matrix: [[f64; 4]; N_BASES],

    // Derived fields, filled by Mplp::stat.
    pub tc: u32,
    pub ad: u32,
    pub dp: u32,
    pub oth: u32,
    pub gl: Vec<f64>,
    pub n_gl: usize,
}

impl Plp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.base_counts = [0; N_BASES];
        for q in &mut self.quality_lists {
            q.clear();
        }
        self.umi_seen.clear();
        self.quality_matrix = [[0.0; 4]; N_BASES];
        self.tc = 0;
        self.ad = 0;
        self.dp = 0;
        self.oth = 0;
        self.gl.clear();
        self.n_gl = 0;
    }

    /// Push a resolved read. If UMIs are in use, a read whose UMI has already
    /// been seen in this group at this SNV is a no-op (first read wins, no
    /// reconciliation across duplicates -- SPEC_FULL.md §4.3). Returns `true`
    /// if the read was counted.
    pub fn push(&mut self, probe: &ReadProbe) -> bool {
        if let Some(umi) = &probe.umi {
            if self.umi_seen.contains(umi.as_str()) {
                return false;
            }
            self.umi_seen.insert(umi.clone());
        }
        self.base_counts[probe.base_index] += 1;
        self.quality_lists[probe.base_index].push(probe.base_quality);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ReadProbe;
    use pretty_assertions::assert_eq;

    fn probe(base_index: usize, qual: u8, umi: Option<&str>) -> ReadProbe {
        ReadProbe {
            cell_barcode: None,
            umi: umi.map(String::from),
            base_index,
            base_quality: qual,
        }
    }

    #[test]
    fn push_without_umi_always_counts() {
        let mut plp = Plp::new();
        assert!(plp.push(&probe(0, 30, None)));
        assert!(plp.push(&probe(0, 30, None)));
        assert_eq!(plp.base_counts[0], 2);
        assert_eq!(plp.quality_lists[0], vec![30, 30]);
    }

    #[test]
    fn push_with_umi_dedups_same_key() {
        let mut plp = Plp::new();
        assert!(plp.push(&probe(0, 30, Some("UMI1"))));
        assert!(!plp.push(&probe(1, 40, Some("UMI1"))));
        assert_eq!(plp.base_counts[0], 1);
        assert_eq!(plp.base_counts[1], 0);
    }

    #[test]
    fn push_with_umi_counts_distinct_keys() {
        let mut plp = Plp::new();
        assert!(plp.push(&probe(0, 30, Some("UMI1"))));
        assert!(plp.push(&probe(0, 30, Some("UMI2"))));
        assert_eq!(plp.base_counts[0], 2);
    }

    #[test]
    fn reset_clears_all_state() {
        let mut plp = Plp::new();
        plp.push(&probe(0, 30, None));
        plp.tc = 5;
        plp.reset();
        assert_eq!(plp.base_counts, [0; N_BASES]);
        assert!(plp.quality_lists.iter().all(|q| q.is_empty()));
        assert_eq!(plp.tc, 0);
    }
}
