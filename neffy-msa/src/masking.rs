//! Randomized column-masking search.
//!
//! Starting from the unmasked NEFF, each trial gaps out a uniformly random
//! subset of `floor(mask_frac * L_effective)` retained columns in a copy of
//! the alignment and recomputes the NEFF under the baseline column mask. The
//! trial with the highest NEFF (first occurrence on ties) is reported along
//! with its masked alignment.
//!
//! All trial masks are drawn up front from one seeded generator, so the
//! outcome does not depend on whether trials are evaluated in parallel.

use std::time::{Duration, Instant};

use neffy_core::{ContentAddressable, Result, Scored};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::alignment::Alignment;
use crate::config::MaskingConfig;
use crate::filter::ColumnMask;
use crate::neff::Prepared;

/// One evaluated mask.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskIteration {
    /// 0 for the unmasked baseline, `1..=mask_count` for trials.
    pub index: usize,
    /// Columns overwritten with gaps (original alignment coordinates).
    pub masked_columns: ColumnMask,
    /// Scalar NEFF of the masked copy.
    pub neff: f64,
    /// Whether this trial raised the running maximum over the trials so far.
    pub is_best_so_far: bool,
}

impl Scored for MaskIteration {
    fn score(&self) -> f64 {
        self.neff
    }
}

/// Summary of a masking search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskingRun {
    /// Retained columns (L_effective).
    pub msa_length: usize,
    /// Sequences taken into account after the depth cap.
    pub msa_depth: usize,
    /// Unmasked NEFF.
    pub baseline: MaskIteration,
    /// Trials in order.
    pub trials: Vec<MaskIteration>,
    /// Index into `trials` of the highest NEFF.
    pub best: usize,
    /// The input alignment with the best trial's columns gapped.
    pub best_alignment: Alignment,
    /// Wall-clock time of the search.
    pub elapsed: Duration,
}

impl MaskingRun {
    pub fn initial_neff(&self) -> f64 {
        self.baseline.neff
    }

    pub fn highest_neff(&self) -> f64 {
        self.trials[self.best].neff
    }

    pub fn best_iteration(&self) -> &MaskIteration {
        &self.trials[self.best]
    }

    /// NEFF of every trial, in order.
    pub fn trace(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.neff).collect()
    }
}

/// Draw `count` masks of `k` columns each from `mask`.
fn draw_masks(mask: &ColumnMask, k: usize, count: usize, seed: u64) -> Vec<ColumnMask> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let picked = rand::seq::index::sample(&mut rng, mask.len(), k)
                .into_iter()
                .map(|i| mask.columns()[i])
                .collect();
            ColumnMask::from_columns(picked)
        })
        .collect()
}

/// Index of the maximum NEFF, lowest index on ties; also flags running maxima.
fn fold_best(trials: &mut [MaskIteration]) -> usize {
    let mut best = 0;
    for i in 0..trials.len() {
        let improved = i == 0 || trials[i].neff > trials[best].neff;
        if improved {
            best = i;
        }
        trials[i].is_best_so_far = improved;
    }
    best
}

/// Run the masking search on `alignment`.
///
/// # Errors
///
/// Returns [`neffy_core::NeffError::Validation`] if `mask_count` is zero or
/// `mask_frac` is not strictly inside (0, 1), plus every error of
/// [`crate::neff::compute_neff`].
pub fn mask_search(alignment: &Alignment, config: &MaskingConfig) -> Result<MaskingRun> {
    config.validate()?;
    let neff_config = &config.neff;
    let prepared = Prepared::new(alignment, neff_config)?;

    let _span = tracing::info_span!("masking_search", trials = config.mask_count).entered();
    let started = Instant::now();

    let baseline = MaskIteration {
        index: 0,
        masked_columns: ColumnMask::default(),
        neff: prepared.scalar_of(&prepared.alignment, neff_config),
        is_best_so_far: false,
    };

    let k = (config.mask_frac * prepared.length() as f64).floor() as usize;
    let masks = draw_masks(&prepared.mask, k, config.mask_count, config.seed);
    tracing::debug!(columns_per_trial = k, length = prepared.length(), "drawn trial masks");

    let evaluate = |(i, masked_columns): (usize, ColumnMask)| {
        let masked = prepared.alignment.with_gapped_columns(masked_columns.columns());
        MaskIteration {
            index: i + 1,
            neff: prepared.scalar_of(&masked, neff_config),
            masked_columns,
            is_best_so_far: false,
        }
    };

    #[cfg(feature = "parallel")]
    let mut trials: Vec<MaskIteration> = {
        use rayon::prelude::*;
        masks.into_par_iter().enumerate().map(evaluate).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let mut trials: Vec<MaskIteration> = masks.into_iter().enumerate().map(evaluate).collect();

    let best = fold_best(&mut trials);
    let best_alignment = alignment.with_gapped_columns(trials[best].masked_columns.columns());
    let elapsed = started.elapsed();

    tracing::info!(
        initial_neff = baseline.neff,
        highest_neff = trials[best].neff,
        best_trial = trials[best].index,
        elapsed_secs = elapsed.as_secs_f64(),
        best_digest = %best_alignment.content_hash(),
        "masking search finished"
    );

    Ok(MaskingRun {
        msa_length: prepared.length(),
        msa_depth: prepared.depth(),
        baseline,
        trials,
        best,
        best_alignment,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::config::{NeffConfig, Normalization};
    use neffy_core::NeffError;

    fn aln() -> Alignment {
        Alignment::from_sequences(
            &[
                "ACDEFGHIKL",
                "ACDEFGHIKW",
                "ACDEFGWWWW",
                "WCDEFGHIKL",
                "MNPQRSTVWY",
                "MNPQRSTVWA",
            ],
            Alphabet::Protein,
        )
        .unwrap()
    }

    fn config(count: usize, frac: f64) -> MaskingConfig {
        MaskingConfig::new(
            NeffConfig {
                normalization: Normalization::None,
                ..NeffConfig::default()
            },
            count,
            frac,
        )
    }

    #[test]
    fn masks_floor_fraction_of_columns_per_trial() {
        let run = mask_search(&aln(), &config(5, 0.5)).unwrap();
        assert_eq!(run.trials.len(), 5);
        assert_eq!(run.baseline.index, 0);
        assert!(run.baseline.masked_columns.is_empty());
        for (k, trial) in run.trials.iter().enumerate() {
            assert_eq!(trial.index, k + 1);
            assert_eq!(trial.masked_columns.len(), 5);
            assert!(trial.masked_columns.columns().iter().all(|&c| c < 10));
        }
    }

    #[test]
    fn best_is_max_of_trace_first_on_ties() {
        let run = mask_search(&aln(), &config(8, 0.3)).unwrap();
        let trace = run.trace();
        let max = trace.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(run.highest_neff(), max);
        let first = trace.iter().position(|&v| v == max).unwrap();
        assert_eq!(run.best, first);
        assert!(run.trials[0].is_best_so_far);
    }

    #[test]
    fn symmetric_masking_never_beats_baseline() {
        let run = mask_search(&aln(), &config(10, 0.4)).unwrap();
        assert!(run.highest_neff() <= run.initial_neff() + 1e-12);
    }

    #[test]
    fn best_alignment_is_masked_copy() {
        let input = aln();
        let run = mask_search(&input, &config(3, 0.2)).unwrap();
        let cols = run.best_iteration().masked_columns.columns().to_vec();
        assert_eq!(cols.len(), 2);
        for record in run.best_alignment.records() {
            for &c in &cols {
                assert_eq!(record.residues()[c], b'-');
            }
        }
        assert_eq!(input, aln());
    }

    #[test]
    fn same_seed_same_run() {
        let a = mask_search(&aln(), &config(6, 0.5)).unwrap();
        let b = mask_search(&aln(), &config(6, 0.5)).unwrap();
        assert_eq!(a.trials, b.trials);
        let mut other = config(6, 0.5);
        other.seed = 7;
        let c = mask_search(&aln(), &other).unwrap();
        assert_eq!(c.trials.len(), 6);
    }

    #[test]
    fn invalid_parameters() {
        assert!(matches!(mask_search(&aln(), &config(0, 0.5)), Err(NeffError::Validation(_))));
        assert!(matches!(mask_search(&aln(), &config(3, 1.0)), Err(NeffError::Validation(_))));
        assert!(matches!(mask_search(&aln(), &config(3, 0.0)), Err(NeffError::Validation(_))));
    }

    #[test]
    fn fold_prefers_first_maximum() {
        let mut trials: Vec<MaskIteration> = [1.0, 3.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &neff)| MaskIteration {
                index: i + 1,
                masked_columns: ColumnMask::default(),
                neff,
                is_best_so_far: false,
            })
            .collect();
        assert_eq!(fold_best(&mut trials), 1);
        let flags: Vec<bool> = trials.iter().map(|t| t.is_best_so_far).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }
}
