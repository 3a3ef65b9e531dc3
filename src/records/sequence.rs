//! The [`Sequence`] record, yielded by FASTA and FASTQ readers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str;

use crate::error::HtsError;

/// A named nucleotide sequence, with optional per-base Phred quality
/// scores (FASTQ only).
///
/// The sequence itself is stored as raw [`Bytes`], exactly as read from the
/// file; no case normalization or alphabet validation is done.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub descr: String,
    pub seq: Bytes,
    qual: Option<Vec<u8>>,
}

impl Sequence {
    /// Create a new [`Sequence`] without a description or qualities.
    pub fn new(seq: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descr: String::new(),
            seq: seq.into(),
            qual: None,
        }
    }

    /// Create a new [`Sequence`] carrying Phred quality scores.
    ///
    /// # Errors
    ///
    /// Returns [`HtsError::QualityLengthMismatch`] if the number of quality
    /// scores differs from the sequence length.
    pub fn with_qualities(
        seq: impl Into<Bytes>,
        name: impl Into<String>,
        qual: Vec<u8>,
    ) -> Result<Self, HtsError> {
        let seq = seq.into();
        let name = name.into();
        if seq.len() != qual.len() {
            return Err(HtsError::QualityLengthMismatch {
                name,
                seq_len: seq.len(),
                qual_len: qual.len(),
            });
        }
        Ok(Self {
            name,
            descr: String::new(),
            seq,
            qual: Some(qual),
        })
    }

    /// Set the description (the text after the name on the header line).
    pub fn descr(mut self, descr: impl Into<String>) -> Self {
        self.descr = descr.into();
        self
    }

    /// Phred quality scores, if this sequence came from a FASTQ file.
    pub fn qual(&self) -> Option<&[u8]> {
        self.qual.as_deref()
    }

    /// Get the length of the sequence.
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Return whether this is an empty sequence.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sequence as a string slice, if it is valid UTF-8.
    pub fn seq_str(&self) -> Result<&str, HtsError> {
        Ok(str::from_utf8(&self.seq)?)
    }

    /// Qualities re-encoded as Phred+33 ASCII, as they would appear in a
    /// Sanger FASTQ file.
    pub fn qual_string(&self) -> Option<String> {
        self.qual
            .as_ref()
            .map(|qual| qual.iter().map(|q| (q.saturating_add(33)) as char).collect())
    }

    /// Reverse complement of this sequence. IUPAC ambiguity codes are
    /// complemented, case is preserved, and qualities are reversed. The
    /// name gets a `[rc]` suffix.
    pub fn reverse_complement(&self) -> Self {
        let seq: Vec<u8> = self.seq.iter().rev().map(|&b| complement(b)).collect();
        let qual = self.qual.as_ref().map(|qual| {
            let mut qual = qual.clone();
            qual.reverse();
            qual
        });
        Self {
            name: format!("{}[rc]", self.name),
            descr: self.descr.clone(),
            seq: Bytes::from(seq),
            qual,
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match str::from_utf8(&self.seq) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'a' => b't',
        b't' => b'a',
        b'u' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        // S, W, N, gaps and anything else map to themselves
        other => other,
    }
}
