//! FASTQ lazy parser.
//!
//! Records are exactly four lines: `@name description`, the sequence, a `+`
//! separator (optionally repeating the name), and the qualities. Multi-line
//! FASTQ is not supported.

use std::io::BufRead;

use crate::error::HtsError;
use crate::io::reader::{Reader, RecordDecoder};
use crate::io::tokenizer::{strip_terminator, LineTokenizer};
use crate::io::Source;
use crate::records::{Entry, Sequence};

/// How quality characters map to Phred scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QualityEncoding {
    /// Sanger / Illumina 1.8+: Phred + 33.
    #[default]
    Phred,
    /// Illumina 1.3 to 1.7: Phred + 64.
    Solexa,
    /// Illumina before 1.3: Solexa scores + 64, converted to Phred.
    SolexaOld,
}

impl QualityEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            QualityEncoding::Phred => "phred",
            QualityEncoding::Solexa => "solexa",
            QualityEncoding::SolexaOld => "solexa-old",
        }
    }

    /// Convert one quality character to a Phred score.
    pub fn decode(&self, c: u8) -> Result<u8, HtsError> {
        let invalid = || HtsError::InvalidQuality(c as char, self.name());
        match self {
            QualityEncoding::Phred if (33..=126).contains(&c) => Ok(c - 33),
            QualityEncoding::Solexa if (64..=126).contains(&c) => Ok(c - 64),
            QualityEncoding::SolexaOld if (59..=126).contains(&c) => {
                let solexa = (c as i32 - 64) as f64;
                let phred = 10.0 * (10f64.powf(solexa / 10.0) + 1.0).log10();
                Ok(phred.round() as u8)
            }
            _ => Err(invalid()),
        }
    }
}

/// Construction options for [`FastqReader`].
#[derive(Clone, Debug, Default)]
pub struct FastqOptions {
    /// Yield each record's four unparsed lines instead of a [`Sequence`].
    pub raw: bool,
    pub quality_encoding: QualityEncoding,
}

impl FastqOptions {
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn quality_encoding(mut self, encoding: QualityEncoding) -> Self {
        self.quality_encoding = encoding;
        self
    }
}

/// Decodes FASTQ records, in parsed or raw mode.
#[derive(Debug, Default)]
pub struct FastqDecoder {
    options: FastqOptions,
    tokenizer: LineTokenizer,
}

impl FastqDecoder {
    pub fn new(options: FastqOptions) -> Self {
        Self {
            options,
            tokenizer: LineTokenizer::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> HtsError {
        HtsError::FastqFormat(self.tokenizer.line_number(), message.into())
    }

    /// The next line of a record that has already started.
    fn record_line(&mut self, reader: &mut dyn BufRead, what: &str) -> Result<String, HtsError> {
        match self.tokenizer.next_line(reader, true)? {
            Some(line) => Ok(line),
            None => Err(HtsError::FastqFormat(
                self.tokenizer.line_number() + 1,
                format!("truncated record, missing {} line", what),
            )),
        }
    }
}

impl RecordDecoder for FastqDecoder {
    type Record = Entry<Sequence>;

    fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<Self::Record>, HtsError> {
        // blank lines between records are tolerated
        let mut raw = String::new();
        let header = loop {
            match self.tokenizer.next_line(reader, true)? {
                // trailing blank lines still belong to the raw text
                None if self.options.raw && !raw.is_empty() => return Ok(Some(Entry::Raw(raw))),
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => raw.push_str(&line),
                Some(line) => break line,
            }
        };
        if !header.starts_with('@') {
            return Err(self.error("expected a '@' header line"));
        }
        let seq = self.record_line(reader, "sequence")?;
        let separator = self.record_line(reader, "'+' separator")?;
        if !separator.starts_with('+') {
            return Err(self.error("expected a '+' separator line"));
        }
        let qual = self.record_line(reader, "quality")?;

        if self.options.raw {
            for line in [&header, &seq, &separator, &qual] {
                raw.push_str(line);
            }
            return Ok(Some(Entry::Raw(raw)));
        }

        let (mut header, mut seq, mut separator, mut qual) = (header, seq, separator, qual);
        for line in [&mut header, &mut seq, &mut separator, &mut qual] {
            strip_terminator(line);
        }
        let header = header[1..].trim();
        let (name, descr) = header
            .split_once(char::is_whitespace)
            .map_or((header, ""), |(name, descr)| (name, descr.trim()));

        let repeated = separator[1..].trim();
        if !repeated.is_empty() && repeated != header && repeated != name {
            return Err(self.error(format!(
                "separator '{}' does not match header '{}'",
                repeated, header
            )));
        }

        let seq = seq.trim_end();
        let qual = qual.trim_end();
        if seq.len() != qual.len() {
            return Err(HtsError::QualityLengthMismatch {
                name: name.to_string(),
                seq_len: seq.len(),
                qual_len: qual.len(),
            });
        }
        let encoding = self.options.quality_encoding;
        let scores = qual
            .bytes()
            .map(|c| encoding.decode(c))
            .collect::<Result<Vec<u8>, HtsError>>()?;

        let sequence = Sequence::with_qualities(seq.as_bytes().to_vec(), name, scores)?.descr(descr);
        Ok(Some(Entry::Parsed(sequence)))
    }
}

/// A lazy FASTQ reader.
pub type FastqReader<'a> = Reader<'a, FastqDecoder>;

impl<'a> Reader<'a, FastqDecoder> {
    pub fn with_options(
        source: impl Into<Source<'a>>,
        options: FastqOptions,
    ) -> Result<Self, HtsError> {
        Reader::new(source, FastqDecoder::new(options))
    }
}
