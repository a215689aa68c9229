//! Multimer decomposition into paired and per-chain alignments.
//!
//! A stoichiometry such as `A2B1` names the chains of a complex in strictly
//! ascending letter order with a positive copy count each. For a heteromer the
//! alignment's columns are split into one contiguous span per chain label,
//! using caller-supplied span lengths that must tile the alignment:
//!
//! - the **individual** alignment of a chain holds every row that is not
//!   entirely gapped within the chain's span, restricted to that span;
//! - the **paired** alignment holds the rows present in every chain at once,
//!   over all chain spans.
//!
//! Both are cut from the depth-capped rows. With `omit_query_gaps` the
//! columns where the full query has a gap are dropped before splitting, so a
//! chain in which the query is missing has no columns and no NEFF.
//!
//! A homomer (`A<n>`) is a single chain covering the whole alignment.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use neffy_core::{NeffError, Result};
use tracing::instrument;

use crate::alignment::Alignment;
use crate::alphabet::{Alphabet, ResidueEncoder, GAP_CODE};
use crate::config::{MultimerConfig, NeffConfig};
use crate::neff::Prepared;

/// Parsed stoichiometry: `(label, copies)` pairs in ascending label order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stoichiometry {
    components: Vec<(char, usize)>,
}

impl Stoichiometry {
    /// Parse a pattern of `(uppercase letter, positive integer)+`.
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Validation`] if the string is empty, contains
    /// anything but letter/count pairs, has a zero or missing count, or its
    /// letters are not strictly ascending.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| {
            NeffError::Validation(format!(
                "invalid stoichiometry '{}': {} (expected e.g. 'A2' or 'A1B2')",
                s, why
            ))
        };
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return Err(invalid("empty"));
        }

        let mut components: Vec<(char, usize)> = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let label = bytes[pos];
            if !label.is_ascii_uppercase() {
                return Err(invalid("chain labels must be uppercase letters"));
            }
            pos += 1;
            let digits_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let digits = &s[digits_start..pos];
            if digits.is_empty() || digits.starts_with('0') {
                return Err(invalid("each label needs a positive copy count"));
            }
            let copies: usize = digits
                .parse()
                .map_err(|_| invalid("copy count out of range"))?;
            let label = label as char;
            if let Some(&(previous, _)) = components.last() {
                if label <= previous {
                    return Err(invalid("labels must be strictly ascending"));
                }
            }
            components.push((label, copies));
        }

        Ok(Self { components })
    }

    /// `(label, copies)` pairs in label order.
    pub fn components(&self) -> &[(char, usize)] {
        &self.components
    }

    /// Number of distinct chain labels.
    pub fn n_chains(&self) -> usize {
        self.components.len()
    }

    /// Exactly one distinct label, and it is `A`.
    pub fn is_homomer(&self) -> bool {
        self.components.len() == 1 && self.components[0].0 == 'A'
    }
}

impl FromStr for Stoichiometry {
    type Err = NeffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Stoichiometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, copies) in &self.components {
            write!(f, "{}{}", label, copies)?;
        }
        Ok(())
    }
}

/// A contiguous column span of the multimer alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chain {
    pub label: char,
    pub copies: usize,
    /// First column (0-based).
    pub start: usize,
    /// Number of columns.
    pub length: usize,
}

impl Chain {
    /// Column indices covered by the chain.
    pub fn columns(&self) -> Range<usize> {
        self.start..self.start + self.length
    }

    /// Whether `residues` holds at least one symbol within the chain that
    /// `encoder` does not fold into a gap.
    pub fn is_present_in(&self, residues: &[u8], encoder: &ResidueEncoder) -> bool {
        residues[self.columns()]
            .iter()
            .any(|&b| encoder.encode(b) != GAP_CODE)
    }
}

/// Split `n_columns` into chain spans.
///
/// For a homomer `chain_lengths` may be omitted; if given, its single entry
/// must be the full length or the per-copy length.
///
/// # Errors
///
/// Returns [`NeffError::Validation`] if a heteromer has no chain lengths, the
/// number of lengths differs from the number of labels, a length is zero, or
/// the lengths do not sum to `n_columns`.
pub fn split_chains(
    stoichiometry: &Stoichiometry,
    chain_lengths: Option<&[usize]>,
    n_columns: usize,
) -> Result<Vec<Chain>> {
    if stoichiometry.is_homomer() {
        let copies = stoichiometry.components[0].1;
        if let Some(lengths) = chain_lengths {
            let fits = matches!(lengths, [l] if *l == n_columns || l.checked_mul(copies) == Some(n_columns));
            if !fits {
                return Err(NeffError::Validation(format!(
                    "chain_lengths {:?} do not describe a homomer of {} columns",
                    lengths, n_columns
                )));
            }
        }
        return Ok(vec![Chain {
            label: 'A',
            copies,
            start: 0,
            length: n_columns,
        }]);
    }

    let lengths = chain_lengths.ok_or_else(|| {
        NeffError::Validation(format!(
            "chain_lengths are required for heteromer stoichiometry {}",
            stoichiometry
        ))
    })?;
    if lengths.len() != stoichiometry.n_chains() {
        return Err(NeffError::Validation(format!(
            "{} chain lengths given for {} chains in {}",
            lengths.len(),
            stoichiometry.n_chains(),
            stoichiometry
        )));
    }
    if let Some(pos) = lengths.iter().position(|&l| l == 0) {
        return Err(NeffError::Validation(format!(
            "chain length {} for chain {} must be positive",
            lengths[pos], stoichiometry.components[pos].0
        )));
    }
    let total: usize = lengths.iter().sum();
    if total != n_columns {
        return Err(NeffError::Validation(format!(
            "chain lengths {:?} sum to {}, but the alignment has {} columns",
            lengths, total, n_columns
        )));
    }

    let mut start = 0;
    Ok(stoichiometry
        .components
        .iter()
        .zip(lengths)
        .map(|(&(label, copies), &length)| {
            let chain = Chain {
                label,
                copies,
                start,
                length,
            };
            start += length;
            chain
        })
        .collect())
}

/// NEFF of one decomposed sub-alignment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainNeff {
    /// `None` when no row covers the chain or no column is retained.
    pub neff: Option<f64>,
    /// Sequences in the sub-alignment.
    pub depth: usize,
    /// Retained columns of the sub-alignment.
    pub length: usize,
}

impl ChainNeff {
    fn absent() -> Self {
        Self {
            neff: None,
            depth: 0,
            length: 0,
        }
    }
}

/// Multimer NEFF breakdown.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultimerNeff {
    pub stoichiometry: Stoichiometry,
    /// NEFF of the undecomposed alignment.
    pub entire: ChainNeff,
    /// Paired alignment; `None` for homomers.
    pub paired: Option<ChainNeff>,
    /// Individual alignment of each chain label.
    pub chains: BTreeMap<char, ChainNeff>,
}

/// Rows of `alignment` for which `keep` holds.
fn rows_where(alignment: &Alignment, keep: impl Fn(&[u8]) -> bool) -> Vec<usize> {
    alignment
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| keep(r.residues()))
        .map(|(i, _)| i)
        .collect()
}

/// Validate and compute all sub-alignment pipelines of `alignment`.
///
/// # Errors
///
/// Returns [`NeffError::Validation`] for an invalid stoichiometry or chain
/// lengths, plus every error of [`crate::neff::compute_neff`].
#[instrument(skip_all, fields(stoichiometry = %config.stoichiometry))]
pub fn compute_multimer_neff(alignment: &Alignment, config: &MultimerConfig) -> Result<MultimerNeff> {
    config.validate()?;
    let stoichiometry = Stoichiometry::parse(&config.stoichiometry)?;
    let base = &config.neff;
    let entire_prepared = Prepared::new(alignment, base)?;
    let chains = split_chains(
        &stoichiometry,
        config.chain_lengths.as_deref(),
        alignment.n_columns(),
    )?;

    // Sub-alignments are cut from the depth-capped rows. Query-gap omission
    // follows the full query, whose chain segment may be missing.
    let capped = &entire_prepared.alignment;
    let encoder = &entire_prepared.encoder;
    let query = capped.query().residues();
    let kept = |columns: &mut dyn Iterator<Item = usize>| -> Vec<usize> {
        columns
            .filter(|&c| !base.omit_query_gaps || !Alphabet::is_gap(query[c]))
            .collect()
    };
    let sub_config = NeffConfig {
        omit_query_gaps: false,
        ..base.clone()
    };

    let sub_neff = |rows: &[usize], columns: Vec<usize>| -> Result<ChainNeff> {
        if rows.is_empty() {
            return Ok(ChainNeff::absent());
        }
        if columns.is_empty() {
            return Ok(ChainNeff {
                neff: None,
                depth: rows.len(),
                length: 0,
            });
        }
        let sub = capped.select_rows(rows)?.select_columns(&columns)?;
        let prepared = Prepared::new(&sub, &sub_config)?;
        Ok(ChainNeff {
            neff: Some(prepared.scalar_of(&prepared.alignment, &sub_config)),
            depth: prepared.depth(),
            length: prepared.length(),
        })
    };

    let entire = ChainNeff {
        neff: Some(entire_prepared.scalar_of(&entire_prepared.alignment, base)),
        depth: entire_prepared.depth(),
        length: entire_prepared.length(),
    };

    if stoichiometry.is_homomer() {
        let mut by_label = BTreeMap::new();
        by_label.insert('A', entire.clone());
        return Ok(MultimerNeff {
            stoichiometry,
            entire,
            paired: None,
            chains: by_label,
        });
    }

    let paired_rows = rows_where(capped, |r| chains.iter().all(|c| c.is_present_in(r, encoder)));
    let paired = sub_neff(&paired_rows, kept(&mut chains.iter().flat_map(|c| c.columns())))?;

    let mut by_label = BTreeMap::new();
    for chain in &chains {
        let rows = rows_where(capped, |r| chain.is_present_in(r, encoder));
        let columns = kept(&mut chain.columns());
        if rows.is_empty() {
            tracing::warn!(chain = %chain.label, "chain has no sequences, NEFF left empty");
        } else if columns.is_empty() {
            tracing::warn!(chain = %chain.label, "query has no residues in chain, NEFF left empty");
        }
        by_label.insert(chain.label, sub_neff(&rows, columns)?);
    }

    Ok(MultimerNeff {
        stoichiometry,
        entire,
        paired: Some(paired),
        chains: by_label,
    })
}
