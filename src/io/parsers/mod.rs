//! Lazy record decoders for each supported format.
//!
//! Every format is read through the same [`Reader`] type, paired with a
//! format-specific [`RecordDecoder`]. The aliases below name the common
//! pairings:
//!
//!  - [`FastaReader`] yields [`Entry<Sequence>`] items, without qualities.
//!
//!  - [`FastqReader`] yields [`Entry<Sequence>`] items, with Phred qualities.
//!
//!  - [`AlignmentReader`] (also [`BamReader`]) yields [`Alignment`] items
//!    from either SAM text or BAM binary input.
//!
//!  - [`GffReader`] yields [`GenomicFeature`] items.
//!
//! FASTA and FASTQ readers have a *raw* mode, set through their options,
//! in which each item is the record's unparsed text ([`Entry::Raw`])
//! rather than a parsed [`Sequence`] ([`Entry::Parsed`]).
//!
//! All readers work on plaintext and gzip-compressed input (including
//! BGZF); compression is detected from the content, not the file
//! extension.
//!
//! # Handling formats not known at compile time
//!
//! When the format is only known at runtime (e.g. from a command-line
//! argument), use [`GenomicFile::detect()`] to map a path to a format and
//! `match` on the result, as the `htstream count` subcommand does.
//!
//! [`Reader`]: crate::io::reader::Reader
//! [`RecordDecoder`]: crate::io::reader::RecordDecoder
//! [`Entry<Sequence>`]: crate::records::Entry
//! [`Entry::Raw`]: crate::records::Entry::Raw
//! [`Entry::Parsed`]: crate::records::Entry::Parsed
//! [`Sequence`]: crate::records::Sequence
//! [`Alignment`]: crate::records::Alignment
//! [`GenomicFeature`]: crate::records::GenomicFeature

pub mod alignment;
pub mod fasta;
pub mod fastq;
pub mod gff;
pub mod utils;

pub use alignment::{
    AlignmentDecoder, AlignmentFormat, AlignmentOptions, AlignmentReader, BamReader,
};
pub use fasta::{FastaDecoder, FastaOptions, FastaReader};
pub use fastq::{FastqDecoder, FastqOptions, FastqReader, QualityEncoding};
pub use gff::{GffDecoder, GffReader};

use std::path::PathBuf;

use crate::error::HtsError;

use self::utils::get_base_extension;

/// Enum that indicates the format of some genomic file.
#[derive(Debug, PartialEq)]
pub enum GenomicFile {
    Fasta(PathBuf),
    Fastq(PathBuf),
    Alignment(PathBuf),
    Gff(PathBuf),
}

impl GenomicFile {
    /// Detect the format of a file from its extension, ignoring any
    /// compression-related extension (`.gz` and `.bgz`).
    ///
    /// Currently this supports:
    ///  1. FASTA: `.fa`, `.fasta`, `.fna`, `.faa`.
    ///  2. FASTQ: `.fq`, `.fastq`.
    ///  3. SAM/BAM: `.sam`, `.bam`. Whether the content is SAM or BAM is
    ///     decided when reading, so a mislabeled file still works.
    ///  4. GFF3: `.gff`, `.gff3`.
    pub fn detect(filepath: impl Into<PathBuf>) -> Result<Self, HtsError> {
        let path: PathBuf = filepath.into();
        let extension = get_base_extension(&path).ok_or(HtsError::CouldNotDetectFormat)?;
        Self::from_format(&extension, path)
    }

    /// Map a format name (an extension, or a name like `fastq`) to a variant.
    pub fn from_format(format: &str, path: PathBuf) -> Result<Self, HtsError> {
        match format.to_ascii_lowercase().as_str() {
            "fa" | "fasta" | "fna" | "faa" => Ok(GenomicFile::Fasta(path)),
            "fq" | "fastq" => Ok(GenomicFile::Fastq(path)),
            "sam" | "bam" => Ok(GenomicFile::Alignment(path)),
            "gff" | "gff3" => Ok(GenomicFile::Gff(path)),
            _ => Err(HtsError::CouldNotDetectFormat),
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            GenomicFile::Fasta(path)
            | GenomicFile::Fastq(path)
            | GenomicFile::Alignment(path)
            | GenomicFile::Gff(path) => path,
        }
    }
}
