//! Record value types yielded by the readers.
//!
//! Every reader yields an [`Entry<T>`] for its record type `T`. In the
//! default parsed mode this is [`Entry::Parsed`] holding the decoded record;
//! readers constructed in raw mode instead yield [`Entry::Raw`], holding the
//! unparsed text of the record exactly as it appeared in the input
//! (line terminators included), so concatenating all raw entries
//! reconstructs the decompressed input.
//!
//! All record types derive [`serde::Serialize`] and [`serde::Deserialize`].

pub mod alignment;
pub mod feature;
pub mod sequence;

pub use alignment::{Alignment, CigarKind, CigarOp, Header, TagCode, TagValue, Tags};
pub use feature::{GenomicFeature, Strand};
pub use sequence::Sequence;

use serde::{Deserialize, Serialize};

/// One item from a reader: either a parsed record or its raw text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Entry<T> {
    Parsed(T),
    Raw(String),
}

impl<T> Entry<T> {
    /// The parsed record, if this entry is one.
    pub fn parsed(self) -> Option<T> {
        match self {
            Entry::Parsed(record) => Some(record),
            Entry::Raw(_) => None,
        }
    }

    /// The raw text, if this entry came from a raw-mode reader.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Entry::Parsed(_) => None,
            Entry::Raw(text) => Some(text),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Entry::Raw(_))
    }
}
