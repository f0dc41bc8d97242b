//! # Genotype-likelihood numerics
//!
//! A small, self-contained, pure-function module: turns per-base quality
//! observations into Phred-scaled genotype likelihoods. Deliberately has no
//! knowledge of I/O, sample groups, or the pileup engine (SPEC_FULL.md §4.4a)
//! -- a stand-in for the fuller external numerics collaborator the distilled
//! spec describes but does not fully specify.

/// Convert one base quality into a 4-slot error-model vector: `out[0]` is the
/// probability the observed base matches the true base, and `out[1..4]` split
/// the remaining error mass evenly across the three alternatives.
pub fn get_qual_vector(qual: u8, cap: u8, floor: f64, out: &mut [f64; 4]) {
    let capped = qual.min(cap);
    let mut e = 10f64.powf(-(f64::from(capped)) / 10.0);
    let floor_e = floor / 100.0;
    if e < floor_e {
        e = floor_e;
    }
    out[0] = 1.0 - e;
    out[1] = e / 3.0;
    out[2] = e / 3.0;
    out[3] = e / 3.0;
}

/// One genotype dosage: the expected mixture fraction of the alt allele.
struct Dosage {
    alt_fraction: f64,
}

const CORE_DOSAGES: [Dosage; 3] = [
    Dosage { alt_fraction: 0.0 }, // homozygous ref
    Dosage { alt_fraction: 0.5 }, // heterozygous
    Dosage { alt_fraction: 1.0 }, // homozygous alt
];

const DOUBLE_DOSAGES: [Dosage; 2] = [
    Dosage { alt_fraction: 0.25 },
    Dosage { alt_fraction: 0.75 },
];

/// log10-likelihood of the accumulated quality matrix under one dosage.
///
/// `qmat[b]` is the summed [P(match), P(err-> other 3)] vectors over every
/// read observed at base `b`. For the ref/alt bases we weight the observed
/// match/mismatch mass by the dosage's expected allele mixture; all other
/// observed bases are pure sequencing error regardless of dosage.
fn log10_likelihood(
    qmat: &[[f64; 4]; 5],
    ref_idx: usize,
    alt_idx: usize,
    dosage: &Dosage,
) -> f64 {
    let mut log_lik = 0.0f64;
    for base in 0..5 {
        let acc = &qmat[base];
        let total: f64 = acc.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let p = if base == ref_idx {
            (1.0 - dosage.alt_fraction) * acc[0] + dosage.alt_fraction * (acc[1] + acc[2] + acc[3]) / 3.0
        } else if base == alt_idx {
            dosage.alt_fraction * acc[0] + (1.0 - dosage.alt_fraction) * (acc[1] + acc[2] + acc[3]) / 3.0
        } else {
            acc[1]
        };
        if p > 0.0 {
            log_lik += p.log10();
        }
    }
    log_lik
}

/// Evaluate genotype likelihoods for each candidate dosage and Phred-scale
/// them (`-10 * log10(likelihood)`), writing the result into `gl`/`ngl`.
pub fn qual_matrix_to_geno(
    qmat: &[[f64; 4]; 5],
    _bc: &[u32; 5],
    ref_idx: usize,
    alt_idx: usize,
    double_gl: bool,
    gl: &mut Vec<f64>,
    ngl: &mut usize,
) {
    gl.clear();
    for dosage in &CORE_DOSAGES {
        gl.push(-10.0 * log10_likelihood(qmat, ref_idx, alt_idx, dosage));
    }
    if double_gl {
        for dosage in &DOUBLE_DOSAGES {
            gl.push(-10.0 * log10_likelihood(qmat, ref_idx, alt_idx, dosage));
        }
    }
    *ngl = gl.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qual_vector_high_quality_favors_match() {
        let mut out = [0.0; 4];
        get_qual_vector(40, 45, 0.25, &mut out);
        assert!(out[0] > 0.999);
        assert!((out[1] - out[2]).abs() < 1e-12);
    }

    #[test]
    fn qual_vector_caps_extreme_quality() {
        let mut capped = [0.0; 4];
        let mut uncapped = [0.0; 4];
        get_qual_vector(93, 45, 0.25, &mut capped);
        get_qual_vector(45, 45, 0.25, &mut uncapped);
        assert_eq!(capped, uncapped);
    }

    #[test]
    fn qual_vector_floors_error_probability() {
        let mut out = [0.0; 4];
        get_qual_vector(100, 45, 0.25, &mut out);
        assert!(out[1] >= 0.25 / 100.0 / 3.0 - 1e-15);
    }

    #[test]
    fn homozygous_ref_pileup_favors_ref_dosage() {
        let mut qmat = [[0.0; 4]; 5];
        let mut q = [0.0; 4];
        get_qual_vector(30, 45, 0.25, &mut q);
        for _ in 0..20 {
            for i in 0..4 {
                qmat[0][i] += q[i];
            }
        }
        let mut gl = Vec::new();
        let mut ngl = 0;
        let bc = [20, 0, 0, 0, 0];
        qual_matrix_to_geno(&qmat, &bc, 0, 1, false, &mut gl, &mut ngl);
        assert_eq!(ngl, 3);
        // Phred-scaled: lower is better. Hom-ref dosage (index 0) should win.
        assert!(gl[0] < gl[1]);
        assert!(gl[0] < gl[2]);
    }

    #[test]
    fn double_gl_adds_two_points() {
        let qmat = [[0.0; 4]; 5];
        let bc = [0; 5];
        let mut gl = Vec::new();
        let mut ngl = 0;
        qual_matrix_to_geno(&qmat, &bc, 0, 1, true, &mut gl, &mut ngl);
        assert_eq!(ngl, 5);
    }
}
