//! In-memory multiple sequence alignment and its validator.
//!
//! An [`Alignment`] is an ordered list of [`Record`]s of equal length over a
//! declared [`Alphabet`]. Residues are upper-cased on construction. The first
//! record is the query; query-relative operations (gap omission, position
//! windows) are defined against it.

use std::collections::HashSet;
use std::fmt;

use neffy_core::{ContentAddressable, NeffError, Result, Summarizable};

use crate::alphabet::{Alphabet, GAP};

/// One aligned sequence: identifier plus residues (gaps included).
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    id: String,
    residues: Vec<u8>,
}

impl Record {
    /// Create a record; residues are upper-cased.
    pub fn new(id: impl Into<String>, residues: impl AsRef<[u8]>) -> Self {
        Self {
            id: id.into(),
            residues: residues
                .as_ref()
                .iter()
                .map(|b| b.to_ascii_uppercase())
                .collect(),
        }
    }

    /// Sequence identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Aligned residues.
    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    fn with_residues(&self, residues: Vec<u8>) -> Self {
        Self {
            id: self.id.clone(),
            residues,
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = std::str::from_utf8(&self.residues).unwrap_or("???");
        write!(f, "Record({}, \"{}\")", self.id, s)
    }
}

/// A multiple sequence alignment.
///
/// Invariants: at least one record, at least one column, every record has the
/// same length.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    records: Vec<Record>,
    alphabet: Alphabet,
}

impl Alignment {
    /// Build an alignment, checking its shape.
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Format`] if `records` is empty, the rows have
    /// zero length, or two rows differ in length.
    pub fn new(records: Vec<Record>, alphabet: Alphabet) -> Result<Self> {
        check_shape(&records)?;
        Ok(Self { records, alphabet })
    }

    /// Build an alignment from bare residue strings, naming rows `seq1`, `seq2`, ...
    pub fn from_sequences<S: AsRef<[u8]>>(sequences: &[S], alphabet: Alphabet) -> Result<Self> {
        let records = sequences
            .iter()
            .enumerate()
            .map(|(i, s)| Record::new(format!("seq{}", i + 1), s))
            .collect();
        Self::new(records, alphabet)
    }

    /// Number of sequences (depth N).
    pub fn n_sequences(&self) -> usize {
        self.records.len()
    }

    /// Number of columns (length L).
    pub fn n_columns(&self) -> usize {
        self.records[0].residues.len()
    }

    /// Declared alphabet.
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// All records in input order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The query (first) record.
    pub fn query(&self) -> &Record {
        &self.records[0]
    }

    /// Keep only the first `depth` records (no-op when `depth >= N`).
    pub fn truncated(&self, depth: usize) -> Result<Self> {
        let depth = depth.min(self.records.len());
        Self::new(self.records[..depth].to_vec(), self.alphabet)
    }

    /// Restrict every record to `columns` (in the given order).
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Format`] if `columns` is empty.
    pub fn select_columns(&self, columns: &[usize]) -> Result<Self> {
        let records = self
            .records
            .iter()
            .map(|r| r.with_residues(columns.iter().map(|&c| r.residues[c]).collect()))
            .collect();
        Self::new(records, self.alphabet)
    }

    /// Keep only the records at `rows` (in the given order).
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Format`] if `rows` is empty.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Self> {
        let records = rows.iter().map(|&i| self.records[i].clone()).collect();
        Self::new(records, self.alphabet)
    }

    /// Copy of the alignment with the given columns overwritten by gaps in
    /// every record.
    pub fn with_gapped_columns(&self, columns: &[usize]) -> Self {
        let records = self
            .records
            .iter()
            .map(|r| {
                let mut residues = r.residues.clone();
                for &c in columns {
                    residues[c] = GAP;
                }
                r.with_residues(residues)
            })
            .collect();
        Self {
            records,
            alphabet: self.alphabet,
        }
    }

    /// Column indices where the query holds a non-gap symbol.
    pub fn query_residue_columns(&self) -> Vec<usize> {
        self.query()
            .residues
            .iter()
            .enumerate()
            .filter(|(_, &b)| !Alphabet::is_gap(b))
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop every column where the query has a gap.
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Format`] if the query consists only of gaps.
    pub fn without_query_gaps(&self) -> Result<Self> {
        let columns = self.query_residue_columns();
        if columns.len() == self.n_columns() {
            return Ok(self.clone());
        }
        self.select_columns(&columns)
    }

    /// Merge several alignments, keeping the first occurrence of every
    /// distinct residue string.
    ///
    /// With `omit_query_gaps`, each part first drops its own query-gap
    /// columns, so parts must agree in length after that projection.
    ///
    /// # Errors
    ///
    /// Returns [`NeffError::Format`] if `parts` is empty, or the parts differ
    /// in length or alphabet.
    pub fn integrate_unique(parts: &[Alignment], omit_query_gaps: bool) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| NeffError::Format("no alignments to integrate".into()))?;
        let alphabet = first.alphabet;
        let mut length = None;
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut merged = Vec::new();

        for (k, part) in parts.iter().enumerate() {
            if part.alphabet != alphabet {
                return Err(NeffError::Format(format!(
                    "alignment {} uses alphabet {}, expected {}",
                    k + 1,
                    part.alphabet.name(),
                    alphabet.name()
                )));
            }
            let projected = if omit_query_gaps {
                part.without_query_gaps()?
            } else {
                part.clone()
            };
            let len = projected.n_columns();
            match length {
                None => length = Some(len),
                Some(expected) if expected != len => {
                    return Err(NeffError::Format(format!(
                        "alignment {} has length {}, expected {}",
                        k + 1,
                        len,
                        expected
                    )));
                }
                Some(_) => {}
            }
            for record in projected.records {
                if seen.insert(record.residues.clone()) {
                    merged.push(record);
                }
            }
        }

        Self::new(merged, alphabet)
    }
}

impl ContentAddressable for Alignment {
    fn content_hash(&self) -> String {
        neffy_core::hash::sha256_lines(
            self.records
                .iter()
                .flat_map(|r| [r.id.as_bytes(), r.residues.as_slice()]),
        )
    }
}

impl Summarizable for Alignment {
    fn summary(&self) -> String {
        format!(
            "{} alignment: {} sequences x {} columns",
            self.alphabet.name(),
            self.n_sequences(),
            self.n_columns()
        )
    }
}

fn check_shape(records: &[Record]) -> Result<()> {
    let first = records
        .first()
        .ok_or_else(|| NeffError::Format("alignment has no sequences".into()))?;
    let len = first.residues.len();
    if len == 0 {
        return Err(NeffError::Format(format!(
            "sequence '{}' is empty; alignment length must be positive",
            first.id
        )));
    }
    for (i, r) in records.iter().enumerate() {
        if r.residues.len() != len {
            return Err(NeffError::Format(format!(
                "sequence {} ('{}') has length {}, expected {}",
                i + 1,
                r.id,
                r.residues.len(),
                len
            )));
        }
    }
    Ok(())
}

/// Check an alignment against its alphabet.
///
/// Shape (non-empty, equal lengths) is always checked. Symbols outside the
/// alphabet's standard, non-standard and gap sets are rejected only when
/// `check_symbols` is set; otherwise they are later treated as gaps.
///
/// # Errors
///
/// Returns [`NeffError::Format`] naming the first offending sequence and
/// position.
pub fn validate(alignment: &Alignment, check_symbols: bool) -> Result<()> {
    check_shape(&alignment.records)?;
    if !check_symbols {
        return Ok(());
    }
    let alphabet = alignment.alphabet;
    for (i, r) in alignment.records.iter().enumerate() {
        if let Some(pos) = r.residues.iter().position(|&b| !alphabet.is_valid(b)) {
            let b = r.residues[pos];
            return Err(NeffError::Format(format!(
                "invalid {} symbol '{}' (0x{:02X}) in sequence {} ('{}') at position {}",
                alphabet.name(),
                b as char,
                b,
                i + 1,
                r.id,
                pos + 1
            )));
        }
    }
    Ok(())
}
