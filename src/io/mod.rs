//! Types and methods for reading and parsing input.

pub mod file;
pub mod parsers;
pub mod reader;
pub mod tokenizer;

pub use file::{Compression, InputStream, Ownership, Source};
pub use parsers::{
    AlignmentOptions, AlignmentReader, BamReader, FastaOptions, FastaReader, FastqOptions,
    FastqReader, GenomicFile, GffReader, QualityEncoding,
};
pub use reader::{Reader, ReaderState, RecordDecoder};
