//! GFF3 lazy parser.
//!
//! Data lines have nine tab-separated columns:
//!
//! ```text
//! seqid  source  type  start  end  score  strand  phase  attributes
//! ```
//!
//! Lines starting with `#` are comments, except `##key value` pragmas,
//! which are collected into the reader's metadata. A `##FASTA` pragma ends
//! the feature section, and with it iteration. Attributes are
//! `key=value;...` pairs with `%XX` escapes; GTF-style `key "value";`
//! pairs are read too.

use indexmap::IndexMap;
use std::io::BufRead;

use super::utils::{parse_column, percent_decode};
use crate::error::HtsError;
use crate::io::reader::{Reader, RecordDecoder};
use crate::io::tokenizer::LineTokenizer;
use crate::records::{GenomicFeature, Strand};
use crate::Position;

/// Number of columns in a GFF3 data line.
pub const GFF_COLUMNS: usize = 9;

/// Decodes GFF3 features.
#[derive(Debug, Default)]
pub struct GffDecoder {
    metadata: IndexMap<String, Vec<String>>,
    tokenizer: LineTokenizer,
    in_fasta: bool,
}

impl GffDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `##` pragmas seen so far, by key, in file order. Pragmas before
    /// the first feature are all read when the reader is built.
    pub fn metadata(&self) -> &IndexMap<String, Vec<String>> {
        &self.metadata
    }

    /// Whether a `##FASTA` section was reached.
    pub fn reached_fasta(&self) -> bool {
        self.in_fasta
    }

    fn error(&self, message: impl Into<String>) -> HtsError {
        HtsError::GffFormat(self.tokenizer.line_number(), message.into())
    }

    /// Consume one comment line; returns false if the line ends the
    /// feature section.
    fn handle_comment(&mut self, line: &str) -> bool {
        let Some(pragma) = line.strip_prefix("##") else {
            return true;
        };
        let pragma = pragma.trim();
        if pragma == "FASTA" {
            self.in_fasta = true;
            return false;
        }
        // `###` marks that forward references are resolved
        if pragma.is_empty() || pragma.starts_with('#') {
            return true;
        }
        let (key, value) = pragma
            .split_once(char::is_whitespace)
            .map_or((pragma, ""), |(key, value)| (key, value.trim()));
        self.metadata
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        true
    }

    fn parse_line(&self, line: &str) -> Result<GenomicFeature, HtsError> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != GFF_COLUMNS {
            return Err(self.error(format!(
                "expected {} tab-separated columns, found {}",
                GFF_COLUMNS,
                columns.len()
            )));
        }

        let start: Position = parse_column(columns[3], line)?;
        let end: Position = parse_column(columns[4], line)?;
        let strand = Strand::from_column(columns[6])
            .ok_or_else(|| self.error(format!("invalid strand '{}'", columns[6])))?;

        let mut feature = GenomicFeature::new(
            self.decode(columns[0])?,
            self.decode(columns[2])?,
            start,
            end,
            strand,
        )?;
        feature.source = self.decode(columns[1])?;
        feature.score = match columns[5] {
            "." => None,
            score => Some(
                score
                    .parse()
                    .map_err(|_| self.error(format!("invalid score '{}'", score)))?,
            ),
        };
        feature.frame = match columns[7] {
            "." => None,
            "0" => Some(0),
            "1" => Some(1),
            "2" => Some(2),
            frame => return Err(self.error(format!("invalid phase '{}'", frame))),
        };
        feature.attributes = self.parse_attributes(columns[8])?;
        Ok(feature)
    }

    fn decode(&self, value: &str) -> Result<String, HtsError> {
        percent_decode(value).ok_or_else(|| self.error(format!("bad percent escape in '{}'", value)))
    }

    fn parse_attributes(&self, column: &str) -> Result<IndexMap<String, String>, HtsError> {
        let mut attributes = IndexMap::new();
        if column == "." {
            return Ok(attributes);
        }
        for pair in column.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (self.decode(key)?, self.decode(value)?),
                // GTF style: key "value"
                None => match pair.split_once(char::is_whitespace) {
                    Some((key, value)) => {
                        let value = value.trim();
                        let value = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .unwrap_or(value);
                        (key.to_string(), value.to_string())
                    }
                    None => (self.decode(pair)?, String::new()),
                },
            };
            attributes.insert(key, value);
        }
        Ok(attributes)
    }
}

impl RecordDecoder for GffDecoder {
    type Record = GenomicFeature;

    fn read_header(&mut self, reader: &mut dyn BufRead) -> Result<(), HtsError> {
        while let Some(line) = self.tokenizer.next_line(reader, false)? {
            if !line.starts_with('#') && !line.trim().is_empty() {
                self.tokenizer.push_back(line);
                break;
            }
            if !self.handle_comment(&line) {
                break;
            }
        }
        Ok(())
    }

    fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<GenomicFeature>, HtsError> {
        if self.in_fasta {
            return Ok(None);
        }
        while let Some(line) = self.tokenizer.next_line(reader, false)? {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if !self.handle_comment(&line) {
                    return Ok(None);
                }
                continue;
            }
            return self.parse_line(&line).map(Some);
        }
        Ok(None)
    }
}

/// A lazy GFF3 reader.
pub type GffReader<'a> = Reader<'a, GffDecoder>;

impl<'a> Reader<'a, GffDecoder> {
    pub fn metadata(&self) -> &IndexMap<String, Vec<String>> {
        self.decoder().metadata()
    }
}
