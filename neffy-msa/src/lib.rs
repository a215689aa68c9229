//! Number of Effective Sequences (NEFF) for multiple sequence alignments.
//!
//! Sequences are down-weighted by how many near-identical neighbors they have
//! over a filtered set of alignment columns; the NEFF is the sum of those
//! weights, optionally normalized by the effective length. On top of the base
//! computation the crate offers column-wise and residue-wise breakdowns, a
//! multimer decomposition by stoichiometry, and a randomized column-masking
//! search.
//!
//! # Quick start
//!
//! ```
//! use neffy_msa::{compute_neff, Alignment, Alphabet, NeffConfig};
//!
//! let msa = Alignment::from_sequences(&["ACDEF", "ACDEF", "ACDEF", "ACDEF"], Alphabet::Protein).unwrap();
//! let report = compute_neff(&msa, &NeffConfig::default()).unwrap();
//! let neff = report.result.scalar().unwrap();
//! assert!((neff - 1.0 / 5f64.sqrt()).abs() < 1e-12);
//! ```

pub mod alphabet;
pub mod alignment;
pub mod config;
pub mod filter;
pub mod weights;
pub mod neff;
pub mod multimer;
pub mod masking;

pub use neffy_core::{NeffError, Result};

pub use alphabet::{Alphabet, NonStandardOption, ResidueEncoder};
pub use alignment::{validate, Alignment, Record};
pub use config::{ColumnSummary, MaskingConfig, MultimerConfig, NeffConfig, Normalization};
pub use filter::{build_column_mask, ColumnMask};
pub use weights::{EncodedMsa, SequenceWeights, WeightCalculator};
pub use neff::{
    compute_column_neff, compute_neff, compute_per_column_neff, compute_residue_neff,
    compute_weights, ColumnNeff, NeffReport, NeffResult,
};
pub use multimer::{compute_multimer_neff, ChainNeff, MultimerNeff, Stoichiometry};
pub use masking::{mask_search, MaskIteration, MaskingRun};
