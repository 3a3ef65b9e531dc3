//! FASTA lazy parser.
//!
//! Each record is a `>` header line followed by any number of sequence lines,
//! up to the next header or the end of the stream. The header is split into
//! a name (up to the first whitespace) and a description (the rest).

use std::io::BufRead;

use crate::error::HtsError;
use crate::io::reader::{Reader, RecordDecoder};
use crate::io::tokenizer::{strip_terminator, LineTokenizer};
use crate::io::Source;
use crate::records::{Entry, Sequence};

/// Construction options for [`FastaReader`].
#[derive(Clone, Debug, Default)]
pub struct FastaOptions {
    /// Yield each record's unparsed text instead of a [`Sequence`].
    pub raw: bool,
}

impl FastaOptions {
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

/// Decodes FASTA records, in parsed or raw mode.
#[derive(Debug, Default)]
pub struct FastaDecoder {
    options: FastaOptions,
    tokenizer: LineTokenizer,
}

impl FastaDecoder {
    pub fn new(options: FastaOptions) -> Self {
        Self {
            options,
            tokenizer: LineTokenizer::new(),
        }
    }

    /// Skip to the first header. Blank lines before it are returned so raw
    /// mode can keep them, even when no header follows; any other content is
    /// an error.
    fn next_header(&mut self, reader: &mut dyn BufRead) -> Result<(String, Option<String>), HtsError> {
        let mut leading = String::new();
        loop {
            match self.tokenizer.next_line(reader, true)? {
                None => return Ok((leading, None)),
                Some(line) if line.starts_with('>') => return Ok((leading, Some(line))),
                Some(line) if line.trim().is_empty() => leading.push_str(&line),
                Some(_) => {
                    return Err(HtsError::FastaFormat(
                        self.tokenizer.line_number(),
                        "expected a '>' header line".to_string(),
                    ))
                }
            }
        }
    }
}

impl RecordDecoder for FastaDecoder {
    type Record = Entry<Sequence>;

    fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<Self::Record>, HtsError> {
        let (leading, header) = self.next_header(reader)?;
        let Some(header) = header else {
            if self.options.raw && !leading.is_empty() {
                return Ok(Some(Entry::Raw(leading)));
            }
            return Ok(None);
        };

        let mut raw = leading;
        raw.push_str(&header);
        let mut seq = Vec::new();
        while let Some(line) = self.tokenizer.next_line(reader, true)? {
            if line.starts_with('>') {
                self.tokenizer.push_back(line);
                break;
            }
            if self.options.raw {
                raw.push_str(&line);
            } else {
                seq.extend_from_slice(line.trim_end().as_bytes());
            }
        }

        if self.options.raw {
            return Ok(Some(Entry::Raw(raw)));
        }
        let mut header = header;
        strip_terminator(&mut header);
        Ok(Some(Entry::Parsed(parse_header(&header[1..], seq))))
    }
}

fn parse_header(header: &str, seq: Vec<u8>) -> Sequence {
    let header = header.trim();
    match header.split_once(char::is_whitespace) {
        Some((name, descr)) => Sequence::new(seq, name).descr(descr.trim()),
        None => Sequence::new(seq, header),
    }
}

/// A lazy FASTA reader.
pub type FastaReader<'a> = Reader<'a, FastaDecoder>;

impl<'a> Reader<'a, FastaDecoder> {
    pub fn with_options(
        source: impl Into<Source<'a>>,
        options: FastaOptions,
    ) -> Result<Self, HtsError> {
        Reader::new(source, FastaDecoder::new(options))
    }
}
