//! Alphabet definitions for aligned sequences.
//!
//! Each [`Alphabet`] partitions the accepted bytes (uppercase) into standard
//! residues, non-standard residues and gap symbols. [`NonStandardOption`]
//! decides how non-standard residues take part in NEFF computation, and the
//! residue encoding used by the weight calculator is derived from both.

/// Gap symbols accepted in every alphabet.
pub const GAP_SYMBOLS: &[u8] = b"-.";

/// Gap symbol written into masked or synthesized columns.
pub const GAP: u8 = b'-';

/// Encoded value of a gap (or of anything treated as one).
pub const GAP_CODE: u8 = 0;

/// Biological alphabet of an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alphabet {
    /// 20 standard amino acids plus `XOUBJZ`.
    #[default]
    Protein,
    /// `AUCG` plus `N`.
    Rna,
    /// `ATCG` plus `N`.
    Dna,
}

/// How a byte is classified within an [`Alphabet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    /// A standard residue, carrying its index in [`Alphabet::standard`].
    Standard(u8),
    /// A non-standard residue, carrying its index in [`Alphabet::non_standard`].
    NonStandard(u8),
    /// `-` or `.`.
    Gap,
    /// Not part of the alphabet.
    Invalid,
}

impl Alphabet {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Alphabet::Protein => "Protein",
            Alphabet::Rna => "RNA",
            Alphabet::Dna => "DNA",
        }
    }

    /// Standard residues, in encoding order.
    pub fn standard(self) -> &'static [u8] {
        match self {
            Alphabet::Protein => b"ACDEFGHIKLMNPQRSTVWY",
            Alphabet::Rna => b"AUCG",
            Alphabet::Dna => b"ATCG",
        }
    }

    /// Non-standard (ambiguous or rare) residues, in encoding order.
    pub fn non_standard(self) -> &'static [u8] {
        match self {
            Alphabet::Protein => b"XOUBJZ",
            Alphabet::Rna | Alphabet::Dna => b"N",
        }
    }

    /// Classify an uppercase byte.
    pub fn classify(self, b: u8) -> SymbolClass {
        if GAP_SYMBOLS.contains(&b) {
            return SymbolClass::Gap;
        }
        if let Some(i) = self.standard().iter().position(|&s| s == b) {
            return SymbolClass::Standard(i as u8);
        }
        if let Some(i) = self.non_standard().iter().position(|&s| s == b) {
            return SymbolClass::NonStandard(i as u8);
        }
        SymbolClass::Invalid
    }

    /// Whether `b` is a standard residue, a non-standard residue or a gap.
    pub fn is_valid(self, b: u8) -> bool {
        self.classify(b) != SymbolClass::Invalid
    }

    /// Whether `b` is a gap symbol.
    pub fn is_gap(b: u8) -> bool {
        GAP_SYMBOLS.contains(&b)
    }
}

/// Handling of non-standard residues during NEFF computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NonStandardOption {
    /// Compared like any standard residue.
    #[default]
    AsStandard,
    /// Compared as residues, but counted as gaps for mismatch cutoffs,
    /// column gap fractions and per-column occupancy.
    ConsiderGapInCutoff,
    /// Treated exactly like a gap everywhere.
    ConsiderGap,
}

/// Byte-to-code mapping for one alphabet under one non-standard policy.
///
/// Codes: `0` for gaps, `1..=S` for the `S` standard residues, `S+1..` for
/// non-standard residues (unless [`NonStandardOption::ConsiderGap`] folds them
/// into `0`). Bytes outside the alphabet encode as gaps; rejecting them is the
/// validator's job.
#[derive(Debug, Clone)]
pub struct ResidueEncoder {
    table: [u8; 256],
    n_standard: u8,
    option: NonStandardOption,
}

impl ResidueEncoder {
    /// Build the lookup table for `alphabet` and `option`.
    pub fn new(alphabet: Alphabet, option: NonStandardOption) -> Self {
        let mut table = [GAP_CODE; 256];
        let n_standard = alphabet.standard().len() as u8;
        for (i, &b) in alphabet.standard().iter().enumerate() {
            table[b as usize] = i as u8 + 1;
        }
        if option != NonStandardOption::ConsiderGap {
            for (i, &b) in alphabet.non_standard().iter().enumerate() {
                table[b as usize] = n_standard + i as u8 + 1;
            }
        }
        Self {
            table,
            n_standard,
            option,
        }
    }

    /// Encode one byte.
    #[inline]
    pub fn encode(&self, b: u8) -> u8 {
        self.table[b as usize]
    }

    /// Whether an encoded symbol counts as a residue (rather than gap-like)
    /// for cutoffs, gap fractions and column occupancy.
    #[inline]
    pub fn is_residue(&self, code: u8) -> bool {
        match self.option {
            NonStandardOption::ConsiderGapInCutoff => code != GAP_CODE && code <= self.n_standard,
            _ => code != GAP_CODE,
        }
    }

    /// Whether a raw byte counts as a residue under this policy.
    #[inline]
    pub fn is_residue_byte(&self, b: u8) -> bool {
        self.is_residue(self.encode(b))
    }
}
