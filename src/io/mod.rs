//! # Input loaders
//!
//! Plain delimited-text and VCF parsing for the two input lists the driver
//! needs before dispatching workers: candidate SNVs and the sample-group
//! roster (SPEC_FULL.md §6).
pub mod roster;
pub mod snv_list;
