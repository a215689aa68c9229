//! Similarity-based sequence weights.
//!
//! Each sequence `i` gets weight `1 / n_i`, where `n_i` counts the sequences
//! (itself included) whose identity to `i` over the retained columns reaches
//! the threshold. Two sequences are neighbors when their mismatch count is at
//! most `floor(len * (1 - threshold))`:
//!
//! - **symmetric**: mismatches are counted over every retained column (gap vs
//!   gap matches, gap vs residue mismatches) and `len` is the effective
//!   length, so the relation is undirected;
//! - **asymmetric**: for sequence `i` only columns where `i` holds a residue
//!   count, both as mismatches and toward `len`, so `j` may be a neighbor of
//!   `i` without the converse.
//!
//! Comparisons stream one row at a time and keep only per-row neighbor
//! counts; no N x N matrix is materialized.

use crate::alignment::Alignment;
use crate::alphabet::ResidueEncoder;
use crate::filter::ColumnMask;

/// Slack for `len * (1 - threshold)` landing a hair below an integer.
const CUTOFF_EPSILON: f64 = 1e-9;

/// Maximum number of mismatches allowed between neighbors over `len` columns.
pub fn mismatch_cutoff(len: usize, threshold: f64) -> usize {
    ((len as f64) * (1.0 - threshold) + CUTOFF_EPSILON).floor() as usize
}

/// Residue codes of the retained columns, row-major.
#[derive(Debug, Clone)]
pub struct EncodedMsa {
    codes: Vec<u8>,
    n_rows: usize,
    n_cols: usize,
}

impl EncodedMsa {
    /// Encode the columns of `mask` for every record of `alignment`.
    pub fn new(alignment: &Alignment, mask: &ColumnMask, encoder: &ResidueEncoder) -> Self {
        let n_cols = mask.len();
        let mut codes = Vec::with_capacity(alignment.n_sequences() * n_cols);
        for record in alignment.records() {
            let residues = record.residues();
            codes.extend(mask.columns().iter().map(|&c| encoder.encode(residues[c])));
        }
        Self {
            codes,
            n_rows: alignment.n_sequences(),
            n_cols,
        }
    }

    /// Number of encoded sequences.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of encoded columns (L_effective).
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Codes of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[u8] {
        &self.codes[i * self.n_cols..(i + 1) * self.n_cols]
    }
}

/// Per-sequence neighbor counts; weights are their reciprocals.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceWeights {
    neighbor_counts: Vec<u32>,
}

impl SequenceWeights {
    /// Number of neighbors of each sequence, itself included (always >= 1).
    pub fn neighbor_counts(&self) -> &[u32] {
        &self.neighbor_counts
    }

    /// Weight of each sequence, in (0, 1].
    pub fn weights(&self) -> Vec<f64> {
        self.neighbor_counts.iter().map(|&n| 1.0 / n as f64).collect()
    }

    /// Sum of all weights (the unnormalized NEFF).
    pub fn total(&self) -> f64 {
        self.neighbor_counts.iter().map(|&n| 1.0 / n as f64).sum()
    }

    pub fn len(&self) -> usize {
        self.neighbor_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbor_counts.is_empty()
    }
}

/// Weight calculator over an encoded alignment.
pub struct WeightCalculator<'a> {
    msa: &'a EncodedMsa,
    encoder: &'a ResidueEncoder,
    symmetric: bool,
    cutoffs: Vec<usize>,
}

impl<'a> WeightCalculator<'a> {
    /// Prepare per-row mismatch cutoffs for `threshold`.
    pub fn new(msa: &'a EncodedMsa, encoder: &'a ResidueEncoder, threshold: f64, symmetric: bool) -> Self {
        let cutoffs = if symmetric {
            vec![mismatch_cutoff(msa.n_cols(), threshold)]
        } else {
            (0..msa.n_rows())
                .map(|i| {
                    let residues = msa.row(i).iter().filter(|&&c| encoder.is_residue(c)).count();
                    mismatch_cutoff(residues, threshold)
                })
                .collect()
        };
        Self {
            msa,
            encoder,
            symmetric,
            cutoffs,
        }
    }

    /// Compute neighbor counts for every row.
    pub fn compute(&self) -> SequenceWeights {
        let n = self.msa.n_rows();
        tracing::debug!(
            depth = n,
            length = self.msa.n_cols(),
            symmetric = self.symmetric,
            cutoff = if self.symmetric { self.cutoffs[0] } else { 0 },
            "computing sequence weights"
        );

        #[cfg(feature = "parallel")]
        let neighbor_counts = {
            use rayon::prelude::*;
            (0..n)
                .into_par_iter()
                .map(|i| self.neighbor_count(i))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let neighbor_counts = (0..n).map(|i| self.neighbor_count(i)).collect();

        SequenceWeights { neighbor_counts }
    }

    /// Number of rows `j` (including `i`) that are neighbors of row `i`.
    fn neighbor_count(&self, i: usize) -> u32 {
        let row_i = self.msa.row(i);
        let cutoff = if self.symmetric {
            self.cutoffs[0]
        } else {
            self.cutoffs[i]
        };
        let mut count = 1u32;
        for j in 0..self.msa.n_rows() {
            if j != i && self.within_cutoff(row_i, self.msa.row(j), cutoff) {
                count += 1;
            }
        }
        count
    }

    /// Whether `row_j` differs from `row_i` in at most `cutoff` counted columns.
    #[inline]
    fn within_cutoff(&self, row_i: &[u8], row_j: &[u8], cutoff: usize) -> bool {
        let mut mismatches = 0usize;
        for (&a, &b) in row_i.iter().zip(row_j) {
            if a == b {
                continue;
            }
            if self.symmetric || self.encoder.is_residue(a) {
                mismatches += 1;
                if mismatches > cutoff {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{Alphabet, NonStandardOption};

    fn weights_of(seqs: &[&str], threshold: f64, symmetric: bool, option: NonStandardOption) -> SequenceWeights {
        let aln = Alignment::from_sequences(seqs, Alphabet::Protein).unwrap();
        let encoder = ResidueEncoder::new(Alphabet::Protein, option);
        let msa = EncodedMsa::new(&aln, &ColumnMask::all(aln.n_columns()), &encoder);
        WeightCalculator::new(&msa, &encoder, threshold, symmetric).compute()
    }

    #[test]
    fn cutoff_tolerates_float_rounding() {
        // 5 * (1 - 0.8) is 0.9999999999999998 in f64
        assert_eq!(mismatch_cutoff(5, 0.8), 1);
        assert_eq!(mismatch_cutoff(10, 0.8), 2);
        assert_eq!(mismatch_cutoff(9, 0.8), 1);
        assert_eq!(mismatch_cutoff(0, 0.8), 0);
    }

    #[test]
    fn identical_sequences_share_weight() {
        let w = weights_of(&["ACDEF"; 4], 0.8, true, NonStandardOption::AsStandard);
        assert_eq!(w.neighbor_counts(), &[4, 4, 4, 4]);
        assert_eq!(w.weights(), vec![0.25; 4]);
        assert!((w.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distinct_sequences_weigh_one() {
        let w = weights_of(&["AAAAA", "CCCCC", "DDDDD"], 0.8, true, NonStandardOption::AsStandard);
        assert_eq!(w.neighbor_counts(), &[1, 1, 1]);
        assert!((w.total() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn one_mismatch_in_five_is_neighbor_at_0_8() {
        let w = weights_of(&["ACDEF", "ACDEW", "WWDEF"], 0.8, true, NonStandardOption::AsStandard);
        assert_eq!(w.neighbor_counts(), &[2, 2, 1]);
    }

    #[test]
    fn symmetric_counts_gap_mismatches() {
        // two gap-vs-residue mismatches exceed the cutoff of 1 over 5 columns
        let w = weights_of(&["ACDEF", "ACD--"], 0.8, true, NonStandardOption::AsStandard);
        assert_eq!(w.neighbor_counts(), &[1, 1]);
    }

    #[test]
    fn asymmetric_ignores_own_gaps() {
        // row 2 holds 3 residues -> cutoff 0; its gaps do not count against it,
        // while row 1 sees two mismatches against cutoff 1.
        let w = weights_of(&["ACDEF", "ACD--"], 0.8, false, NonStandardOption::AsStandard);
        assert_eq!(w.neighbor_counts(), &[1, 2]);
    }

    #[test]
    fn gap_in_cutoff_excludes_non_standard_from_counts() {
        let seqs = ["ACXXF", "ACDEF"];
        let as_standard = weights_of(&seqs, 0.8, false, NonStandardOption::AsStandard);
        assert_eq!(as_standard.neighbor_counts(), &[1, 1]);
        let in_cutoff = weights_of(&seqs, 0.8, false, NonStandardOption::ConsiderGapInCutoff);
        // row 1: 3 residues, cutoff 0, X columns ignored -> neighbor
        assert_eq!(in_cutoff.neighbor_counts(), &[2, 1]);
    }

    #[test]
    fn consider_gap_matches_gap_against_non_standard() {
        let seqs = ["ACDEX", "ACDE-"];
        let as_standard = weights_of(&seqs, 0.9, true, NonStandardOption::AsStandard);
        assert_eq!(as_standard.neighbor_counts(), &[1, 1]);
        let as_gap = weights_of(&seqs, 0.9, true, NonStandardOption::ConsiderGap);
        assert_eq!(as_gap.neighbor_counts(), &[2, 2]);
    }

    #[test]
    fn higher_threshold_never_lowers_weights() {
        let seqs = ["ACDEFGHIKL", "ACDEFGHIKW", "ACDEFGWWWW", "WCDEFGHIKL", "AC--FGHIKL"];
        for symmetric in [true, false] {
            let mut previous = vec![0.0; seqs.len()];
            for t in [0.3, 0.5, 0.7, 0.8, 0.9, 0.95] {
                let w = weights_of(&seqs, t, symmetric, NonStandardOption::AsStandard).weights();
                for (a, b) in previous.iter().zip(&w) {
                    assert!(b >= a, "t={} symmetric={}", t, symmetric);
                }
                previous = w;
            }
        }
    }

    #[test]
    fn encoded_rows_follow_mask() {
        let aln = Alignment::from_sequences(&["ACDEF", "W-DEF"], Alphabet::Protein).unwrap();
        let encoder = ResidueEncoder::new(Alphabet::Protein, NonStandardOption::AsStandard);
        let msa = EncodedMsa::new(&aln, &ColumnMask::from_columns(vec![1, 4]), &encoder);
        assert_eq!(msa.n_rows(), 2);
        assert_eq!(msa.n_cols(), 2);
        assert_eq!(msa.row(1)[0], 0);
        assert_eq!(msa.row(0)[1], msa.row(1)[1]);
    }
}
