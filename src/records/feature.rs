//! The [`GenomicFeature`] record, yielded by the GFF reader.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HtsError;
use crate::Position;

/// Nucleotide strand enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
    /// `.`: the feature is not stranded.
    Unstranded,
    /// `?`: the feature is stranded, but the strand is unknown.
    Unknown,
}

impl Strand {
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            "." => Some(Strand::Unstranded),
            "?" => Some(Strand::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unstranded => '.',
            Strand::Unknown => '?',
        };
        write!(f, "{}", c)
    }
}

/// One annotated feature (a data line of a GFF3 file).
///
/// `start` and `end` are 1-based and inclusive, as in the file, and
/// `start <= end` always holds for features built through
/// [`GenomicFeature::new()`]. Attribute keys and values are stored
/// percent-decoded, in file order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomicFeature {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: Position,
    pub end: Position,
    pub score: Option<f64>,
    pub strand: Strand,
    pub frame: Option<u8>,
    pub attributes: IndexMap<String, String>,
}

impl GenomicFeature {
    /// Create a new feature, with no score, frame, or attributes.
    ///
    /// # Errors
    ///
    /// Returns [`HtsError::InvalidFeatureRange`] if `start > end`.
    pub fn new(
        seqid: impl Into<String>,
        feature_type: impl Into<String>,
        start: Position,
        end: Position,
        strand: Strand,
    ) -> Result<Self, HtsError> {
        if start > end {
            return Err(HtsError::InvalidFeatureRange(start, end));
        }
        Ok(Self {
            seqid: seqid.into(),
            source: ".".to_string(),
            feature_type: feature_type.into(),
            start,
            end,
            score: None,
            strand,
            frame: None,
            attributes: IndexMap::new(),
        })
    }

    /// Number of bases covered by the feature.
    pub fn width(&self) -> Position {
        self.end - self.start + 1
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The `ID` attribute, falling back to `Name`.
    pub fn id(&self) -> Option<&str> {
        self.attribute("ID").or_else(|| self.attribute("Name"))
    }

    /// The `Parent` attribute, split on commas.
    pub fn parents(&self) -> Vec<&str> {
        self.attribute("Parent")
            .map(|parents| parents.split(',').collect())
            .unwrap_or_default()
    }
}
