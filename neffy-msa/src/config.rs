//! Configuration for NEFF computation.
//!
//! One explicit structure per operation: [`NeffConfig`] for the base
//! pipeline, [`MaskingConfig`] for the masking search and [`MultimerConfig`]
//! for multimer decomposition. Every default comes from [`defaults`], and each
//! structure is validated as a unit before any weighting work begins.

use neffy_core::{NeffError, Result};

use crate::alphabet::{Alphabet, NonStandardOption};

/// Default option values.
pub mod defaults {
    use super::{Alphabet, NonStandardOption, Normalization};

    pub const ALPHABET: Alphabet = Alphabet::Protein;
    pub const THRESHOLD: f64 = 0.8;
    pub const NORMALIZATION: Normalization = Normalization::SqrtLength;
    pub const OMIT_QUERY_GAPS: bool = true;
    pub const IS_SYMMETRIC: bool = true;
    pub const NON_STANDARD_OPTION: NonStandardOption = NonStandardOption::AsStandard;
    /// `None` = every sequence.
    pub const DEPTH: Option<usize> = None;
    /// 1.0 keeps every column.
    pub const GAP_CUTOFF: f64 = 1.0;
    pub const POS_START: usize = 1;
    /// `None` = last column.
    pub const POS_END: Option<usize> = None;
    pub const ONLY_WEIGHTS: bool = false;
    pub const CHECK_VALIDATION: bool = true;
    pub const MASK_SEED: u64 = 0;
}

/// Normalization applied to the summed sequence weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Normalization {
    /// Divide by `sqrt(L_effective)`.
    #[default]
    SqrtLength,
    /// Divide by `L_effective`.
    Length,
    /// Report the raw weight sum.
    None,
}

impl Normalization {
    /// The divisor for an effective length.
    pub fn factor(self, length: usize) -> f64 {
        match self {
            Normalization::SqrtLength => (length as f64).sqrt(),
            Normalization::Length => length as f64,
            Normalization::None => 1.0,
        }
    }

    /// Whether the factor depends on a positive length.
    pub fn needs_length(self) -> bool {
        self != Normalization::None
    }
}

/// Summary statistic over per-column NEFF values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnSummary {
    /// Arithmetic mean (column-wise NEFF).
    Mean,
    /// Median (residue-wise NEFF).
    Median,
}

/// Options for the base NEFF pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeffConfig {
    /// Alphabet the alignment is checked and encoded against.
    pub alphabet: Alphabet,
    /// Minimum identity for two sequences to be neighbors, in (0, 1).
    pub threshold: f64,
    /// Normalization of the weight sum.
    pub normalization: Normalization,
    /// Drop columns where the query has a gap before windowing.
    pub omit_query_gaps: bool,
    /// Undirected (shared-denominator) neighbor relation.
    pub is_symmetric: bool,
    /// Handling of non-standard residues.
    pub non_standard_option: NonStandardOption,
    /// Cap on the number of leading sequences considered.
    pub depth: Option<usize>,
    /// Columns whose gap fraction exceeds this are dropped, in [0, 1].
    pub gap_cutoff: f64,
    /// First column considered (1-based, inclusive).
    pub pos_start: usize,
    /// Last column considered (1-based, inclusive); `None` = last column.
    pub pos_end: Option<usize>,
    /// Return raw per-sequence weights instead of a NEFF.
    pub only_weights: bool,
    /// Reject symbols outside the alphabet instead of treating them as gaps.
    pub check_validation: bool,
}

impl Default for NeffConfig {
    fn default() -> Self {
        Self {
            alphabet: defaults::ALPHABET,
            threshold: defaults::THRESHOLD,
            normalization: defaults::NORMALIZATION,
            omit_query_gaps: defaults::OMIT_QUERY_GAPS,
            is_symmetric: defaults::IS_SYMMETRIC,
            non_standard_option: defaults::NON_STANDARD_OPTION,
            depth: defaults::DEPTH,
            gap_cutoff: defaults::GAP_CUTOFF,
            pos_start: defaults::POS_START,
            pos_end: defaults::POS_END,
            only_weights: defaults::ONLY_WEIGHTS,
            check_validation: defaults::CHECK_VALIDATION,
        }
    }
}

impl NeffConfig {
    /// Default options for the given alphabet.
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            ..Self::default()
        }
    }

    /// Check option values that do not depend on the alignment.
    ///
    /// Position bounds are checked against the alignment when the column
    /// mask is built and fail with [`NeffError::Range`].
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Validation`] for an out-of-range threshold or gap
    /// cutoff, or a zero depth cap.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(NeffError::Validation(format!(
                "threshold {} must be strictly between 0 and 1",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.gap_cutoff) {
            return Err(NeffError::Validation(format!(
                "gap_cutoff {} must be between 0 and 1",
                self.gap_cutoff
            )));
        }
        if self.depth == Some(0) {
            return Err(NeffError::Validation(
                "depth must be a positive number of sequences".into(),
            ));
        }
        Ok(())
    }

    /// Whether the position window and gap filter keep their defaults.
    pub fn has_default_columns(&self) -> bool {
        self.pos_start == defaults::POS_START
            && self.pos_end == defaults::POS_END
            && self.gap_cutoff == defaults::GAP_CUTOFF
    }
}

/// Options for the masking search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskingConfig {
    /// Base pipeline options (`only_weights` is ignored).
    pub neff: NeffConfig,
    /// Number of randomized trials, at least 1.
    pub mask_count: usize,
    /// Fraction of retained columns masked per trial, in (0, 1).
    pub mask_frac: f64,
    /// Seed for the trial column draws.
    pub seed: u64,
}

impl MaskingConfig {
    /// Masking options on top of `neff`, using the default seed.
    pub fn new(neff: NeffConfig, mask_count: usize, mask_frac: f64) -> Self {
        Self {
            neff,
            mask_count,
            mask_frac,
            seed: defaults::MASK_SEED,
        }
    }

    /// # Errors
    ///
    /// Returns [`NeffError::Validation`] if the base options are invalid,
    /// `mask_count` is zero, or `mask_frac` is not strictly inside (0, 1).
    pub fn validate(&self) -> Result<()> {
        self.neff.validate()?;
        if self.mask_count == 0 {
            return Err(NeffError::Validation(
                "mask_count must be a positive number of trials".into(),
            ));
        }
        if !(self.mask_frac > 0.0 && self.mask_frac < 1.0) {
            return Err(NeffError::Validation(format!(
                "mask_frac {} must be strictly between 0 and 1",
                self.mask_frac
            )));
        }
        Ok(())
    }
}

/// Options for multimer decomposition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultimerConfig {
    /// Base pipeline options; the position window and gap cutoff must stay
    /// at their defaults. `only_weights` is ignored.
    pub neff: NeffConfig,
    /// Stoichiometry such as `A2B1`.
    pub stoichiometry: String,
    /// Column span of each chain label, in label order. Required for heteromers.
    pub chain_lengths: Option<Vec<usize>>,
}

impl MultimerConfig {
    pub fn new(neff: NeffConfig, stoichiometry: impl Into<String>, chain_lengths: Option<Vec<usize>>) -> Self {
        Self {
            neff,
            stoichiometry: stoichiometry.into(),
            chain_lengths,
        }
    }

    /// Check the base options and the column-filter guard.
    ///
    /// The stoichiometry string and chain lengths are checked when parsed by
    /// the decomposer.
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Validation`] for invalid base options or a
    /// non-default position window / gap cutoff.
    pub fn validate(&self) -> Result<()> {
        self.neff.validate()?;
        if !self.neff.has_default_columns() {
            return Err(NeffError::Validation(
                "multimer mode requires default pos_start, pos_end and gap_cutoff, \
                 since chain lengths refer to alignment columns"
                    .into(),
            ));
        }
        Ok(())
    }
}
