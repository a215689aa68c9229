//! NEFF aggregation and the base pipeline.
//!
//! The pipeline runs validator → depth cap → column mask → weights →
//! aggregation. Aggregation reduces [`SequenceWeights`] to a scalar NEFF, a
//! per-column NEFF with a mean or median summary, or returns the raw weights.

use neffy_core::{NeffError, Result, Scored, Summarizable};
use tracing::instrument;

use crate::alignment::{self, Alignment};
use crate::alphabet::ResidueEncoder;
use crate::config::{ColumnSummary, NeffConfig, Normalization};
use crate::filter::{build_column_mask, ColumnMask};
use crate::weights::{EncodedMsa, SequenceWeights, WeightCalculator};

/// Per-column NEFF values and their summary statistic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnNeff {
    /// One value per retained column, in column order.
    pub values: Vec<f64>,
    /// Which statistic `statistic` holds.
    pub summary: ColumnSummary,
    /// Mean or median of `values`.
    pub statistic: f64,
}

/// Outcome of a NEFF computation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeffResult {
    /// Normalized weight sum.
    Scalar(f64),
    /// Per-column breakdown.
    PerColumn(ColumnNeff),
    /// Unnormalized per-sequence weights.
    Weights(Vec<f64>),
}

impl NeffResult {
    /// The scalar NEFF, if this is a scalar result.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            NeffResult::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// A NEFF result together with the dimensions it was computed over.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeffReport {
    /// Retained columns (L_effective).
    pub msa_length: usize,
    /// Sequences taken into account after the depth cap.
    pub msa_depth: usize,
    pub result: NeffResult,
}

impl Scored for NeffReport {
    /// Scalar NEFF, per-column statistic, or weight sum.
    fn score(&self) -> f64 {
        match &self.result {
            NeffResult::Scalar(v) => *v,
            NeffResult::PerColumn(c) => c.statistic,
            NeffResult::Weights(w) => w.iter().sum(),
        }
    }
}

/// A validated, depth-capped alignment with its column mask and encoder.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub alignment: Alignment,
    pub mask: ColumnMask,
    pub encoder: ResidueEncoder,
}

impl Prepared {
    /// Validate `config` and `alignment`, cap the depth and build the mask.
    pub fn new(alignment: &Alignment, config: &NeffConfig) -> Result<Self> {
        config.validate()?;
        if alignment.alphabet() != config.alphabet {
            return Err(NeffError::Validation(format!(
                "alignment declares alphabet {}, but {} was requested",
                alignment.alphabet().name(),
                config.alphabet.name()
            )));
        }
        alignment::validate(alignment, config.check_validation)?;
        tracing::debug!(msa = %alignment.summary(), "preparing alignment");

        let capped = match config.depth {
            Some(depth) if depth < alignment.n_sequences() => alignment.truncated(depth)?,
            _ => alignment.clone(),
        };
        let encoder = ResidueEncoder::new(config.alphabet, config.non_standard_option);
        let mask = build_column_mask(&capped, config, &encoder)?;
        if mask.is_empty() && config.normalization.needs_length() {
            return Err(NeffError::Computation(format!(
                "no columns retained after filtering (gap_cutoff {}), \
                 cannot normalize by alignment length",
                config.gap_cutoff
            )));
        }

        Ok(Self {
            alignment: capped,
            mask,
            encoder,
        })
    }

    pub fn depth(&self) -> usize {
        self.alignment.n_sequences()
    }

    pub fn length(&self) -> usize {
        self.mask.len()
    }

    pub fn encode(&self, alignment: &Alignment) -> EncodedMsa {
        EncodedMsa::new(alignment, &self.mask, &self.encoder)
    }

    /// Weights of `alignment` (the prepared one or a same-shape masked copy).
    pub fn weights_of(&self, alignment: &Alignment, config: &NeffConfig) -> SequenceWeights {
        let msa = self.encode(alignment);
        WeightCalculator::new(&msa, &self.encoder, config.threshold, config.is_symmetric).compute()
    }

    pub fn weights(&self, config: &NeffConfig) -> SequenceWeights {
        self.weights_of(&self.alignment, config)
    }

    /// Scalar NEFF of `alignment` under the prepared mask.
    pub fn scalar_of(&self, alignment: &Alignment, config: &NeffConfig) -> f64 {
        scalar_neff(&self.weights_of(alignment, config), config.normalization, self.length())
    }
}

/// Normalized sum of sequence weights.
pub fn scalar_neff(weights: &SequenceWeights, normalization: Normalization, length: usize) -> f64 {
    weights.total() / normalization.factor(length)
}

/// Per-column NEFF: for each encoded column, the weights of the rows holding a
/// residue there, summed and normalized by the effective length.
pub fn column_values(
    msa: &EncodedMsa,
    encoder: &ResidueEncoder,
    weights: &SequenceWeights,
    normalization: Normalization,
) -> Vec<f64> {
    let w = weights.weights();
    let mut sums = vec![0.0f64; msa.n_cols()];
    for (i, wi) in w.iter().enumerate() {
        for (sum, &code) in sums.iter_mut().zip(msa.row(i)) {
            if encoder.is_residue(code) {
                *sum += wi;
            }
        }
    }
    let factor = normalization.factor(msa.n_cols());
    sums.into_iter().map(|s| s / factor).collect()
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median (average of the two middle values for even lengths); `0.0` for an
/// empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compute the NEFF of `alignment`.
///
/// Returns [`NeffResult::Weights`] when `config.only_weights` is set,
/// otherwise [`NeffResult::Scalar`].
///
/// # Errors
///
/// - [`NeffError::Validation`] for invalid options or an alphabet mismatch
/// - [`NeffError::Format`] for a malformed alignment
/// - [`NeffError::Range`] for an invalid position window
/// - [`NeffError::Computation`] if filtering leaves no column to normalize by
#[instrument(skip_all, fields(depth = alignment.n_sequences(), length = alignment.n_columns()))]
pub fn compute_neff(alignment: &Alignment, config: &NeffConfig) -> Result<NeffReport> {
    let prepared = Prepared::new(alignment, config)?;
    let weights = prepared.weights(config);
    let result = if config.only_weights {
        NeffResult::Weights(weights.weights())
    } else {
        NeffResult::Scalar(scalar_neff(&weights, config.normalization, prepared.length()))
    };
    Ok(NeffReport {
        msa_length: prepared.length(),
        msa_depth: prepared.depth(),
        result,
    })
}

/// Raw per-sequence weights, bypassing normalization.
///
/// # Errors
///
/// Same as [`compute_neff`].
pub fn compute_weights(alignment: &Alignment, config: &NeffConfig) -> Result<Vec<f64>> {
    let prepared = Prepared::new(alignment, config)?;
    Ok(prepared.weights(config).weights())
}

/// Per-column NEFF summarized by `summary`.
///
/// # Errors
///
/// Same as [`compute_neff`].
#[instrument(skip_all, fields(depth = alignment.n_sequences(), length = alignment.n_columns()))]
pub fn compute_per_column_neff(
    alignment: &Alignment,
    config: &NeffConfig,
    summary: ColumnSummary,
) -> Result<NeffReport> {
    let prepared = Prepared::new(alignment, config)?;
    let msa = prepared.encode(&prepared.alignment);
    let weights =
        WeightCalculator::new(&msa, &prepared.encoder, config.threshold, config.is_symmetric).compute();
    let values = column_values(&msa, &prepared.encoder, &weights, config.normalization);
    let statistic = match summary {
        ColumnSummary::Mean => mean(&values),
        ColumnSummary::Median => median(&values),
    };
    Ok(NeffReport {
        msa_length: prepared.length(),
        msa_depth: prepared.depth(),
        result: NeffResult::PerColumn(ColumnNeff {
            values,
            summary,
            statistic,
        }),
    })
}

/// Column-wise NEFF, summarized by the mean.
pub fn compute_column_neff(alignment: &Alignment, config: &NeffConfig) -> Result<NeffReport> {
    compute_per_column_neff(alignment, config, ColumnSummary::Mean)
}

/// Residue-wise NEFF, summarized by the median.
pub fn compute_residue_neff(alignment: &Alignment, config: &NeffConfig) -> Result<NeffReport> {
    compute_per_column_neff(alignment, config, ColumnSummary::Median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{Alphabet, NonStandardOption};

    fn aln(seqs: &[&str]) -> Alignment {
        Alignment::from_sequences(seqs, Alphabet::Protein).unwrap()
    }

    fn no_norm() -> NeffConfig {
        NeffConfig {
            normalization: Normalization::None,
            ..NeffConfig::default()
        }
    }

    #[test]
    fn four_identical_sequences_give_neff_one() {
        let a = aln(&["ACDEF"; 4]);
        let report = compute_neff(&a, &no_norm()).unwrap();
        assert_eq!(report.msa_length, 5);
        assert_eq!(report.msa_depth, 4);
        assert!((report.result.scalar().unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(compute_weights(&a, &no_norm()).unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn normalizations_divide_the_same_sum() {
        let a = aln(&["ACDEFGHIK", "ACDEFGHIW", "WWWEFGHIK", "CCCCCCCCC"]);
        let raw = compute_neff(&a, &no_norm()).unwrap().score();
        let sqrt = compute_neff(&a, &NeffConfig::default()).unwrap().score();
        let len = compute_neff(
            &a,
            &NeffConfig {
                normalization: Normalization::Length,
                ..NeffConfig::default()
            },
        )
        .unwrap()
        .score();
        assert!((sqrt - raw / 3.0).abs() < 1e-12);
        assert!((len - raw / 9.0).abs() < 1e-12);
    }

    #[test]
    fn only_weights_returns_vector() {
        let a = aln(&["ACDEF", "ACDEF", "WWWWW"]);
        let cfg = NeffConfig {
            only_weights: true,
            ..NeffConfig::default()
        };
        let report = compute_neff(&a, &cfg).unwrap();
        assert_eq!(report.result, NeffResult::Weights(vec![0.5, 0.5, 1.0]));
        assert!((report.score() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn depth_cap_takes_leading_sequences() {
        let a = aln(&["ACDEF", "ACDEF", "WWWWW", "CCCCC"]);
        let cfg = NeffConfig {
            depth: Some(2),
            ..no_norm()
        };
        let report = compute_neff(&a, &cfg).unwrap();
        assert_eq!(report.msa_depth, 2);
        assert!((report.score() - 1.0).abs() < 1e-12);
        let cfg = NeffConfig {
            depth: Some(100),
            ..no_norm()
        };
        assert_eq!(compute_neff(&a, &cfg).unwrap().msa_depth, 4);
    }

    #[test]
    fn alphabet_mismatch_is_validation_error() {
        let a = Alignment::from_sequences(&["ACGT"], Alphabet::Dna).unwrap();
        assert!(matches!(
            compute_neff(&a, &NeffConfig::default()),
            Err(NeffError::Validation(_))
        ));
        assert!(compute_neff(&a, &NeffConfig::for_alphabet(Alphabet::Dna)).is_ok());
    }

    #[test]
    fn invalid_symbols_fail_unless_tolerated() {
        let a = aln(&["AC#EF", "ACDEF"]);
        assert!(matches!(compute_neff(&a, &no_norm()), Err(NeffError::Format(_))));
        let cfg = NeffConfig {
            check_validation: false,
            ..no_norm()
        };
        assert!(compute_neff(&a, &cfg).is_ok());
    }

    #[test]
    fn empty_mask_cannot_be_normalized() {
        let a = aln(&["A-", "-C"]);
        let cfg = NeffConfig {
            gap_cutoff: 0.0,
            omit_query_gaps: false,
            ..NeffConfig::default()
        };
        assert!(matches!(compute_neff(&a, &cfg), Err(NeffError::Computation(_))));
    }

    #[test]
    fn bad_threshold_fails_before_work() {
        let a = aln(&["ACDEF"]);
        let cfg = NeffConfig {
            threshold: 1.0,
            ..NeffConfig::default()
        };
        assert!(matches!(compute_neff(&a, &cfg), Err(NeffError::Validation(_))));
    }

    #[test]
    fn query_gap_columns_do_not_count() {
        let a = aln(&["AC-DE", "ACWDE"]);
        let report = compute_neff(&a, &no_norm()).unwrap();
        assert_eq!(report.msa_length, 4);
        assert!((report.score() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn column_neff_bounded_by_occupancy() {
        let a = aln(&["ACDEF", "AC-EF", "W--EF", "WWWW-"]);
        let cfg = NeffConfig {
            omit_query_gaps: false,
            ..no_norm()
        };
        let report = compute_column_neff(&a, &cfg).unwrap();
        let NeffResult::PerColumn(cols) = &report.result else {
            panic!("expected per-column result");
        };
        assert_eq!(cols.values.len(), 5);
        assert_eq!(cols.summary, ColumnSummary::Mean);
        let occupancy = [4.0, 3.0, 2.0, 4.0, 3.0];
        for (v, occ) in cols.values.iter().zip(occupancy) {
            assert!(*v <= occ + 1e-12);
        }
        assert!((cols.statistic - mean(&cols.values)).abs() < 1e-12);
    }

    #[test]
    fn residue_neff_reports_median() {
        let a = aln(&["ACDEF", "AC-EF", "A--EF"]);
        let cfg = NeffConfig {
            omit_query_gaps: false,
            ..no_norm()
        };
        let report = compute_residue_neff(&a, &cfg).unwrap();
        let NeffResult::PerColumn(cols) = report.result else {
            panic!("expected per-column result");
        };
        assert_eq!(cols.summary, ColumnSummary::Median);
        assert!((cols.statistic - median(&cols.values)).abs() < 1e-12);
    }

    #[test]
    fn column_occupancy_follows_non_standard_policy() {
        let a = aln(&["AX", "AX"]);
        let base = NeffConfig {
            omit_query_gaps: false,
            ..no_norm()
        };
        let report = compute_column_neff(&a, &base).unwrap();
        let NeffResult::PerColumn(cols) = report.result else {
            panic!("expected per-column result");
        };
        assert_eq!(cols.values, vec![1.0, 1.0]);

        let cfg = NeffConfig {
            non_standard_option: NonStandardOption::ConsiderGapInCutoff,
            ..base
        };
        let report = compute_column_neff(&a, &cfg).unwrap();
        let NeffResult::PerColumn(cols) = report.result else {
            panic!("expected per-column result");
        };
        assert_eq!(cols.values, vec![1.0, 0.0]);
    }

    #[test]
    fn median_and_mean() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[]), 0.0);
    }
}
