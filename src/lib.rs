//! # htstream: streaming readers for genomic file formats
//!
//! FASTA, FASTQ, SAM/BAM, and GFF3 records are all read through one
//! [`Reader`](io::Reader) type with one contract: build it from a path, a
//! path-like value, or an open handle; iterate it once; close it (or let it
//! drop). Gzip and BGZF compression are detected from the content.
//!
//! ```no_run
//! use htstream::prelude::*;
//!
//! let mut reader = AlignmentReader::from_path("tests_data/example.sam")?;
//! for alignment in reader.by_ref() {
//!     let alignment = alignment?;
//!     if alignment.has_optional_field("NM") {
//!         println!("{} {:?}", alignment.read_name, alignment.position);
//!     }
//! }
//! reader.close();
//! # Ok::<(), HtsError>(())
//! ```

pub mod commands;
pub mod error;
pub mod io;
pub mod records;
pub mod reporting;
pub mod test_utilities;

/// A 0-based (alignments) or 1-based (GFF3) coordinate on a sequence.
pub type Position = u64;

pub mod prelude {
    pub use crate::error::HtsError;
    pub use crate::io::parsers::GenomicFile;
    pub use crate::io::{
        AlignmentOptions, AlignmentReader, BamReader, FastaOptions, FastaReader, FastqOptions,
        FastqReader, GffReader, QualityEncoding, Reader, ReaderState, Source,
    };
    pub use crate::records::{
        Alignment, Entry, GenomicFeature, Header, Sequence, Strand, TagValue,
    };
}
