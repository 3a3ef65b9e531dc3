//! The [`Alignment`] record and its parts, yielded by the SAM/BAM reader.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::HtsError;
use crate::Position;

pub const FLAG_PAIRED: u16 = 0x1;
pub const FLAG_PROPER_PAIR: u16 = 0x2;
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_MATE_REVERSE: u16 = 0x20;
pub const FLAG_FIRST_IN_PAIR: u16 = 0x40;
pub const FLAG_SECOND_IN_PAIR: u16 = 0x80;
pub const FLAG_SECONDARY: u16 = 0x100;
pub const FLAG_QC_FAIL: u16 = 0x200;
pub const FLAG_DUPLICATE: u16 = 0x400;
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// The reference dictionary and free text of an alignment file header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// The SAM header text (`@HD`, `@SQ`, `@RG`, `@PG`, `@CO` lines).
    pub text: String,
    /// Reference sequence names and their lengths, in file order. A record's
    /// reference id is an index into this map.
    pub references: IndexMap<String, Position>,
}

impl Header {
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.references.get_index(id).map(|(name, _)| name.as_str())
    }

    pub fn reference_id(&self, name: &str) -> Option<usize> {
        self.references.get_index_of(name)
    }

    pub fn reference_len(&self, name: &str) -> Option<Position> {
        self.references.get(name).copied()
    }

    /// Append a reference sequence. Returns `false`, leaving the dictionary
    /// unchanged, if `name` is already declared.
    pub fn add_reference(&mut self, name: String, length: Position) -> bool {
        if self.references.contains_key(&name) {
            return false;
        }
        self.references.insert(name, length);
        true
    }

    /// Whether the header declares no reference sequences at all
    /// (e.g. unaligned PacBio CCS reads).
    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }
}

/// CIGAR operation kinds, in their BAM numeric order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Padding,
    SequenceMatch,
    SequenceMismatch,
}

impl CigarKind {
    const CODES: [u8; 9] = *b"MIDNSHP=X";
    const KINDS: [CigarKind; 9] = [
        CigarKind::Match,
        CigarKind::Insertion,
        CigarKind::Deletion,
        CigarKind::Skip,
        CigarKind::SoftClip,
        CigarKind::HardClip,
        CigarKind::Padding,
        CigarKind::SequenceMatch,
        CigarKind::SequenceMismatch,
    ];

    /// The kind for a BAM op code (the low 4 bits of a packed CIGAR op).
    pub fn from_bam_code(code: u32) -> Option<Self> {
        Self::KINDS.get(code as usize).copied()
    }

    /// The kind for a SAM CIGAR character.
    pub fn from_char(c: u8) -> Option<Self> {
        Self::CODES
            .iter()
            .position(|&code| code == c)
            .map(|i| Self::KINDS[i])
    }

    pub fn as_char(&self) -> char {
        Self::CODES[*self as usize] as char
    }

    /// Whether this operation advances along the reference.
    pub fn consumes_reference(&self) -> bool {
        matches!(
            self,
            CigarKind::Match
                | CigarKind::Deletion
                | CigarKind::Skip
                | CigarKind::SequenceMatch
                | CigarKind::SequenceMismatch
        )
    }

    /// Whether this operation advances along the read.
    pub fn consumes_query(&self) -> bool {
        matches!(
            self,
            CigarKind::Match
                | CigarKind::Insertion
                | CigarKind::SoftClip
                | CigarKind::SequenceMatch
                | CigarKind::SequenceMismatch
        )
    }
}

/// A single CIGAR operation: a kind and a length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// A two-character optional field tag, e.g. `NM` or `RG`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagCode(pub [u8; 2]);

impl TagCode {
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl TryFrom<&str> for TagCode {
    type Error = HtsError;

    fn try_from(tag: &str) -> Result<Self, Self::Error> {
        match tag.as_bytes() {
            [a, b] => Ok(TagCode([*a, *b])),
            _ => Err(HtsError::InvalidColumnType {
                expected_type: "two-character tag".to_string(),
                found_value: tag.to_string(),
                line: tag.to_string(),
            }),
        }
    }
}

impl fmt::Display for TagCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Serialized as a two-character string so tag maps can be map-keyed in
// formats like JSON.
impl Serialize for TagCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TagCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TagCode::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

/// The value of an optional field. Integer types of any width are widened
/// to `i64`; the BAM `B` array subtypes are collapsed into integer and
/// float arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Character(char),
    Integer(i64),
    Float(f32),
    String(String),
    Hex(Vec<u8>),
    IntegerArray(Vec<i64>),
    FloatArray(Vec<f32>),
}

impl TagValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TagValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            TagValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TagValue::Character(c) => write!(f, "{}", c),
            TagValue::Integer(value) => write!(f, "{}", value),
            TagValue::Float(value) => write!(f, "{}", value),
            TagValue::String(value) => write!(f, "{}", value),
            TagValue::Hex(bytes) => {
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            TagValue::IntegerArray(values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", values.join(","))
            }
            TagValue::FloatArray(values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", values.join(","))
            }
        }
    }
}

/// The optional fields of an alignment, in file order.
///
/// Presence is a separate question from the value: [`Tags::get()`] returns
/// `None` only when the tag is absent, so a present `NM:i:0` is
/// `Some(&TagValue::Integer(0))`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(IndexMap<TagCode, TagValue>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TagCode, value: TagValue) -> Option<TagValue> {
        self.0.insert(tag, value)
    }

    /// Whether the tag is present. Tags that are not two characters long
    /// are never present.
    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Remove a tag, keeping the order of the others.
    pub fn remove(&mut self, tag: &str) -> Option<TagValue> {
        let code = TagCode::try_from(tag).ok()?;
        self.0.shift_remove(&code)
    }

    pub fn get(&self, tag: &str) -> Option<&TagValue> {
        let code = TagCode::try_from(tag).ok()?;
        self.0.get(&code)
    }

    /// Like [`Tags::get()`], but absence is an [`HtsError::MissingTag`].
    pub fn require(&self, tag: &str) -> Result<&TagValue, HtsError> {
        self.get(tag)
            .ok_or_else(|| HtsError::MissingTag(tag.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagCode, &TagValue)> {
        self.0.iter()
    }
}

/// A single read alignment from a SAM or BAM file.
///
/// Coordinates are 0-based. Fields that are "unavailable" in the file
/// (reference `*`, position 0 in SAM / -1 in BAM, quality `*`) are `None`.
/// No consistency checks are made between the record's own fields and its
/// mate fields: a record flagged as paired without a mate reference is
/// returned as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub read_name: String,
    pub flags: u16,
    pub reference_id: Option<usize>,
    pub reference_name: Option<String>,
    pub position: Option<Position>,
    pub mapq: u8,
    pub cigar: Vec<CigarOp>,
    pub mate_reference_id: Option<usize>,
    pub mate_reference_name: Option<String>,
    pub mate_position: Option<Position>,
    pub template_length: i32,
    pub seq: Bytes,
    pub qual: Option<Vec<u8>>,
    pub tags: Tags,
}

impl Alignment {
    fn flag(&self, bit: u16) -> bool {
        self.flags & bit != 0
    }

    pub fn is_paired(&self) -> bool {
        self.flag(FLAG_PAIRED)
    }

    pub fn is_proper_pair(&self) -> bool {
        self.flag(FLAG_PROPER_PAIR)
    }

    pub fn is_unmapped(&self) -> bool {
        self.flag(FLAG_UNMAPPED)
    }

    pub fn is_mate_unmapped(&self) -> bool {
        self.flag(FLAG_MATE_UNMAPPED)
    }

    pub fn is_reverse(&self) -> bool {
        self.flag(FLAG_REVERSE)
    }

    pub fn is_mate_reverse(&self) -> bool {
        self.flag(FLAG_MATE_REVERSE)
    }

    pub fn is_first_in_pair(&self) -> bool {
        self.flag(FLAG_FIRST_IN_PAIR)
    }

    pub fn is_second_in_pair(&self) -> bool {
        self.flag(FLAG_SECOND_IN_PAIR)
    }

    pub fn is_secondary(&self) -> bool {
        self.flag(FLAG_SECONDARY)
    }

    pub fn is_qc_fail(&self) -> bool {
        self.flag(FLAG_QC_FAIL)
    }

    pub fn is_duplicate(&self) -> bool {
        self.flag(FLAG_DUPLICATE)
    }

    pub fn is_supplementary(&self) -> bool {
        self.flag(FLAG_SUPPLEMENTARY)
    }

    /// Whether the record is flagged as paired with a mapped mate, yet has
    /// no mate reference.
    pub fn has_inconsistent_mate(&self) -> bool {
        self.is_paired()
            && !self.is_mate_unmapped()
            && self.mate_reference_id.is_none()
            && self.mate_reference_name.is_none()
    }

    pub fn has_optional_field(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn optional_field(&self, tag: &str) -> Option<&TagValue> {
        self.tags.get(tag)
    }

    pub fn require_optional_field(&self, tag: &str) -> Result<&TagValue, HtsError> {
        self.tags.require(tag)
    }

    /// Number of reference bases covered by the CIGAR.
    pub fn reference_len(&self) -> Position {
        self.cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len as Position)
            .sum()
    }

    /// The 0-based, exclusive end of the alignment on the reference.
    pub fn reference_end(&self) -> Option<Position> {
        self.position.map(|start| start + self.reference_len())
    }

    pub fn cigar_string(&self) -> String {
        if self.cigar.is_empty() {
            return "*".to_string();
        }
        self.cigar.iter().map(|op| op.to_string()).collect()
    }
}
