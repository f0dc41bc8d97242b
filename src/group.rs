//! # Sample-group roster
//!
//! A group is either a cell (keyed by barcode) or a bulk library (keyed by
//! sample ID, one per input alignment file, routed by file index). The roster
//! is built once and is fixed for the run; it backs the column order of every
//! output (SPEC_FULL.md §4.4, §9).
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct GroupRoster {
    /// Group name -> insertion-order index. Pre-sized at construction time.
    index: IndexMap<String, usize>,
}

impl GroupRoster {
    pub fn from_names(names: Vec<String>) -> Self {
        let mut index = IndexMap::with_capacity(names.len());
        for name in names {
            let next = index.len();
            index.entry(name).or_insert(next);
        }
        GroupRoster { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Names in insertion order -- the order written to `cellSNP.samples.tsv`
    /// and the column order of every matrix/VCF output.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}
