//! Position window and gap filter.
//!
//! Produces the [`ColumnMask`] of retained alignment columns:
//!
//! 1. candidate columns are all columns, or only the query's residue columns
//!    when `omit_query_gaps` is set;
//! 2. the 1-based `[pos_start, pos_end]` window selects a slice of the
//!    candidates, clamped to their count;
//! 3. columns whose gap fraction exceeds `gap_cutoff` are dropped, with
//!    gap-likeness decided by the non-standard policy.

use neffy_core::{NeffError, Result};

use crate::alignment::Alignment;
use crate::alphabet::ResidueEncoder;
use crate::config::NeffConfig;

/// Retained column indices, strictly increasing, all below the alignment length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnMask {
    columns: Vec<usize>,
}

impl ColumnMask {
    /// Every column of an alignment of length `n_columns`.
    pub fn all(n_columns: usize) -> Self {
        Self {
            columns: (0..n_columns).collect(),
        }
    }

    /// Build a mask from arbitrary indices; they are sorted and de-duplicated.
    pub fn from_columns(mut columns: Vec<usize>) -> Self {
        columns.sort_unstable();
        columns.dedup();
        Self { columns }
    }

    /// Retained column indices.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Number of retained columns (L_effective).
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Fraction of gap-like symbols in column `col`.
pub fn gap_fraction(alignment: &Alignment, col: usize, encoder: &ResidueEncoder) -> f64 {
    let gaps = alignment
        .records()
        .iter()
        .filter(|r| !encoder.is_residue_byte(r.residues()[col]))
        .count();
    gaps as f64 / alignment.n_sequences() as f64
}

/// Build the column mask for `alignment` under `config`.
///
/// `alignment` is expected to be depth-capped already, so gap fractions are
/// taken over the sequences that take part in the computation.
///
/// # Errors
///
/// Returns [`NeffError::Range`] if `pos_start` is below 1 or beyond
/// `pos_end` after clamping to the candidate columns.
pub fn build_column_mask(
    alignment: &Alignment,
    config: &NeffConfig,
    encoder: &ResidueEncoder,
) -> Result<ColumnMask> {
    let candidates = if config.omit_query_gaps {
        alignment.query_residue_columns()
    } else {
        (0..alignment.n_columns()).collect()
    };
    let windowed = apply_window(&candidates, config.pos_start, config.pos_end)?;

    let columns = windowed
        .iter()
        .copied()
        .filter(|&c| gap_fraction(alignment, c, encoder) <= config.gap_cutoff)
        .collect();

    Ok(ColumnMask { columns })
}

fn apply_window(candidates: &[usize], pos_start: usize, pos_end: Option<usize>) -> Result<Vec<usize>> {
    if pos_start < 1 {
        return Err(NeffError::Range(format!(
            "pos_start {} must be at least 1",
            pos_start
        )));
    }
    let len = candidates.len();
    let end = pos_end.map_or(len, |e| e.min(len));
    if pos_start > end {
        return Err(NeffError::Range(format!(
            "pos_start {} is beyond pos_end {} (alignment has {} usable columns)",
            pos_start, end, len
        )));
    }
    Ok(candidates[pos_start - 1..end].to_vec())
}
