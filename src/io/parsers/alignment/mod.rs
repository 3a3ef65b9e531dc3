//! SAM and BAM alignment parsing.
//!
//! One decoder handles both encodings: after decompression, input starting
//! with the `BAM\1` magic is decoded as BAM, anything else as SAM text.
//! The header (reference dictionary) is read once when the reader is built.
//!
//! # Reference checking
//!
//! By default ([`AlignmentOptions::check_references`] is `true`) a file
//! must declare at least one reference sequence, and every record's
//! reference must be in that dictionary. Files without a dictionary (e.g.
//! unaligned PacBio CCS reads) are read by turning this off.
//!
//! # Mate fields
//!
//! Mate fields are never validated against the record's own fields by
//! default: a record flagged as paired that lacks a mate reference is
//! yielded as-is. [`AlignmentOptions::strict_mates`] turns that case into
//! an [`HtsError::InconsistentMate`].

pub mod bam;
pub mod sam;
pub mod tags;

use log::debug;
use std::io::BufRead;

use crate::error::HtsError;
use crate::io::reader::{Reader, RecordDecoder};
use crate::io::tokenizer::{BlockTokenizer, LineTokenizer};
use crate::io::Source;
use crate::records::{Alignment, Header};
use crate::Position;

/// Construction options for [`AlignmentReader`].
#[derive(Clone, Debug)]
pub struct AlignmentOptions {
    /// Require a reference dictionary, and records that refer into it.
    pub check_references: bool,
    /// Reject records flagged as paired with a mapped mate but no mate
    /// reference.
    pub strict_mates: bool,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            check_references: true,
            strict_mates: false,
        }
    }
}

impl AlignmentOptions {
    pub fn check_references(mut self, check: bool) -> Self {
        self.check_references = check;
        self
    }

    pub fn strict_mates(mut self, strict: bool) -> Self {
        self.strict_mates = strict;
        self
    }
}

/// The encoding detected for an alignment stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

/// Decodes SAM or BAM records.
#[derive(Debug, Default)]
pub struct AlignmentDecoder {
    options: AlignmentOptions,
    header: Header,
    format: Option<AlignmentFormat>,
    lines: LineTokenizer,
    blocks: BlockTokenizer,
}

impl AlignmentDecoder {
    pub fn new(options: AlignmentOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The detected encoding; `None` until the header has been read.
    pub fn format(&self) -> Option<AlignmentFormat> {
        self.format
    }

    fn read_sam_header(&mut self, reader: &mut dyn BufRead) -> Result<(), HtsError> {
        while let Some(line) = self.lines.next_line(reader, true)? {
            if !line.starts_with('@') {
                self.lines.push_back(line);
                break;
            }
            if line.starts_with("@SQ\t") {
                let line_number = self.lines.line_number();
                let (name, length) = sam::parse_sq_line(&line, line_number)?;
                if !self.header.add_reference(name.clone(), length) {
                    return Err(HtsError::SamFormat(
                        line_number,
                        format!("duplicate @SQ name '{}'", name),
                    ));
                }
            }
            self.header.text.push_str(&line);
        }
        Ok(())
    }

    fn check_mates(&self, alignment: Alignment) -> Result<Alignment, HtsError> {
        if self.options.strict_mates && alignment.has_inconsistent_mate() {
            return Err(HtsError::InconsistentMate(alignment.read_name));
        }
        Ok(alignment)
    }
}

/// Resolves reference ids and names against a header's dictionary.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceResolver<'h> {
    header: &'h Header,
    check: bool,
}

impl<'h> ReferenceResolver<'h> {
    pub fn new(header: &'h Header, check: bool) -> Self {
        Self { header, check }
    }

    /// Resolve a record's own reference id.
    pub fn resolve_id(&self, id: i32) -> Result<(Option<usize>, Option<String>), HtsError> {
        let Some(id) = checked_id(id)? else {
            return Ok((None, None));
        };
        match self.header.reference_name(id) {
            Some(name) => Ok((Some(id), Some(name.to_string()))),
            None if self.check => Err(HtsError::UnknownReference(id.to_string())),
            None => Ok((Some(id), None)),
        }
    }

    /// Resolve a mate reference id. Unknown ids are kept without a name.
    pub fn resolve_mate_id(&self, id: i32) -> Result<(Option<usize>, Option<String>), HtsError> {
        let Some(id) = checked_id(id)? else {
            return Ok((None, None));
        };
        Ok((Some(id), self.header.reference_name(id).map(String::from)))
    }

    /// Resolve a record's own SAM reference name.
    pub fn resolve_name(&self, name: &str) -> Result<Option<usize>, HtsError> {
        match self.header.reference_id(name) {
            Some(id) => Ok(Some(id)),
            None if self.check => Err(HtsError::UnknownReference(name.to_string())),
            None => Ok(None),
        }
    }

    /// Resolve a SAM mate reference name. Unknown names are kept without an id.
    pub fn resolve_mate_name(&self, name: &str) -> Option<usize> {
        self.header.reference_id(name)
    }
}

/// `-1` means "no reference"; anything more negative is malformed.
fn checked_id(id: i32) -> Result<Option<usize>, HtsError> {
    match id {
        -1 => Ok(None),
        id if id < -1 => Err(HtsError::BamFormat(format!("invalid reference id {}", id))),
        id => Ok(Some(id as usize)),
    }
}

/// `-1` means "no position"; anything more negative is malformed.
fn checked_position(pos: i32) -> Result<Option<Position>, HtsError> {
    match pos {
        -1 => Ok(None),
        pos if pos < -1 => Err(HtsError::BamFormat(format!("invalid position {}", pos))),
        pos => Ok(Some(pos as Position)),
    }
}

impl RecordDecoder for AlignmentDecoder {
    type Record = Alignment;

    fn read_header(&mut self, reader: &mut dyn BufRead) -> Result<(), HtsError> {
        if BlockTokenizer::is_bam(reader)? {
            self.format = Some(AlignmentFormat::Bam);
            self.header.text = self.blocks.read_header_text(reader)?;
            for (name, length) in self.blocks.read_references(reader)? {
                if !self.header.add_reference(name.clone(), length as Position) {
                    return Err(HtsError::BamFormat(format!(
                        "duplicate reference name '{}'",
                        name
                    )));
                }
            }
        } else {
            self.format = Some(AlignmentFormat::Sam);
            self.read_sam_header(reader)?;
        }
        debug!(
            "read {:?} header with {} reference sequences",
            self.format,
            self.header.references.len()
        );

        if self.options.check_references && !self.header.has_references() {
            return Err(HtsError::MissingReferenceDictionary);
        }
        Ok(())
    }

    fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<Alignment>, HtsError> {
        let alignment = match self.format {
            Some(AlignmentFormat::Bam) => {
                let Some(block) = self.blocks.next_block(reader)? else {
                    return Ok(None);
                };
                let resolver = ReferenceResolver::new(&self.header, self.options.check_references);
                bam::decode_record(block, &resolver)?
            }
            Some(AlignmentFormat::Sam) | None => loop {
                let Some(line) = self.lines.next_line(reader, false)? else {
                    return Ok(None);
                };
                if !line.trim().is_empty() {
                    let resolver = ReferenceResolver::new(&self.header, self.options.check_references);
                    break sam::parse_sam_line(&line, self.lines.line_number(), &resolver)?;
                }
            },
        };
        self.check_mates(alignment).map(Some)
    }
}

/// A lazy SAM/BAM reader.
pub type AlignmentReader<'a> = Reader<'a, AlignmentDecoder>;

/// A lazy SAM/BAM reader; the encoding is detected from the content.
pub type BamReader<'a> = AlignmentReader<'a>;

impl<'a> Reader<'a, AlignmentDecoder> {
    pub fn with_options(
        source: impl Into<Source<'a>>,
        options: AlignmentOptions,
    ) -> Result<Self, HtsError> {
        Reader::new(source, AlignmentDecoder::new(options))
    }

    pub fn header(&self) -> &Header {
        self.decoder().header()
    }
}
