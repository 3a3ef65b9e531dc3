//! The [`HtsError`] `enum` definition and error messages.
//!
use std::str::Utf8Error;
use thiserror::Error;

/// The [`HtsError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum HtsError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Source is not readable: {0}")]
    NotReadable(String),
    #[error("Reader has been closed")]
    ReaderClosed,

    // Generic parsing errors
    #[error("Invalid UTF-8 in input: {0}")]
    Utf8Error(#[from] Utf8Error),
    #[error("File has invalid column type entry: expected {expected_type}, found '{found_value}' in line '{line}'")]
    InvalidColumnType {
        expected_type: String,
        found_value: String,
        line: String,
    },

    // Sequence formats
    #[error("Malformed FASTA input at line {0}: {1}")]
    FastaFormat(usize, String),
    #[error("Malformed FASTQ input at line {0}: {1}")]
    FastqFormat(usize, String),
    #[error("Sequence and quality lengths differ for '{name}': {seq_len} bases, {qual_len} qualities")]
    QualityLengthMismatch {
        name: String,
        seq_len: usize,
        qual_len: usize,
    },
    #[error("Quality character '{0}' is out of range for the {1} encoding")]
    InvalidQuality(char, &'static str),

    // Alignment formats
    #[error("Malformed SAM input at line {0}: {1}")]
    SamFormat(usize, String),
    #[error("Malformed BAM input: {0}")]
    BamFormat(String),
    #[error("BAM record truncated: expected {expected} bytes, found {found}")]
    TruncatedRecord { expected: usize, found: usize },
    #[error("Unsupported optional field type '{0}' for tag '{1}'")]
    UnknownTagType(char, String),
    #[error("File has no reference sequences defined; disable reference checking to read it anyway")]
    MissingReferenceDictionary,
    #[error("Reference '{0}' is not in the reference dictionary")]
    UnknownReference(String),
    #[error("Record '{0}' is flagged as paired but its mate reference is missing")]
    InconsistentMate(String),
    #[error("Optional field '{0}' is not present")]
    MissingTag(String),

    // Annotation formats
    #[error("Malformed GFF input at line {0}: {1}")]
    GffFormat(usize, String),
    #[error("Feature range invalid: start ({0}) must not be greater than end ({1})")]
    InvalidFeatureRange(u64, u64),

    // Command line tool related errors
    #[error("Could not detect the file format from extension; use --format")]
    CouldNotDetectFormat,
}
