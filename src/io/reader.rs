//! The [`Reader`] type: one iteration and lifecycle contract for every
//! format.
//!
//! A [`Reader`] pairs a resolved [`InputStream`] with a [`RecordDecoder`]
//! and yields one record per [`Iterator::next()`] call. Its lifecycle is an
//! explicit state machine:
//!
//! ```text
//! Unopened --new()--> Open --end of stream--> Exhausted
//!                       |  --decode error---> Failed
//!                       +--close()/drop-----> Closed
//! ```
//!
//! Opening is eager: construction resolves the source, sniffs compression,
//! and reads any file header, so construction errors (unreadable sources,
//! bad BAM magic, missing reference dictionaries) surface immediately.
//! Iteration is single-pass; an exhausted reader stays exhausted and a
//! reader that hit a decode error yields nothing further. After
//! [`Reader::close()`], reading returns [`HtsError::ReaderClosed`].
//!
//! # Example
//!
//! ```no_run
//! use htstream::prelude::*;
//!
//! let reader = FastqReader::from_path("reads.fastq.gz")?;
//! let total_bases = reader.scoped(|reader| {
//!     let mut total = 0;
//!     for entry in reader {
//!         if let Some(sequence) = entry?.parsed() {
//!             total += sequence.len();
//!         }
//!     }
//!     Ok(total)
//! })?;
//! # Ok::<(), HtsError>(())
//! ```

use std::io::BufRead;
use std::path::PathBuf;

use crate::error::HtsError;
use crate::io::file::{InputStream, Ownership, Source};

/// Converts a decompressed byte stream into records, one at a time.
///
/// Decoders own whatever tokenizer state they need between calls; the
/// stream is passed in on every call so the [`Reader`] keeps sole ownership
/// of it.
pub trait RecordDecoder {
    type Record;

    /// Read anything that precedes the records (e.g. a BAM header). Called
    /// exactly once, during [`Reader`] construction.
    fn read_header(&mut self, _reader: &mut dyn BufRead) -> Result<(), HtsError> {
        Ok(())
    }

    /// Decode the next record, or `None` at the end of the stream.
    fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<Self::Record>, HtsError>;
}

/// Lifecycle state of a [`Reader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Open,
    Exhausted,
    Failed,
    Closed,
}

/// A streaming reader over records decoded by `D`.
pub struct Reader<'a, D: RecordDecoder> {
    stream: Option<InputStream<'a>>,
    decoder: D,
    state: ReaderState,
    ownership: Ownership,
}

impl<D: RecordDecoder> std::fmt::Debug for Reader<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("stream", &self.stream)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, D: RecordDecoder> Reader<'a, D> {
    /// Resolve `source`, read the header through `decoder`, and return an
    /// open reader.
    pub fn new(source: impl Into<Source<'a>>, mut decoder: D) -> Result<Self, HtsError> {
        let mut stream = InputStream::open(source)?;
        let ownership = stream.ownership();
        decoder.read_header(stream.reader())?;
        Ok(Self {
            stream: Some(stream),
            decoder,
            state: ReaderState::Open,
            ownership,
        })
    }

    /// Construct a reader and run `f` on it inside [`Reader::scoped()`].
    /// Construction errors are returned from here, before `f` runs.
    pub fn open_scoped<T, F>(source: impl Into<Source<'a>>, decoder: D, f: F) -> Result<T, HtsError>
    where
        F: FnOnce(&mut Self) -> Result<T, HtsError>,
    {
        Self::new(source, decoder)?.scoped(f)
    }

    /// Run `f` with this reader, then close it whatever `f` returned. The
    /// result of `f`, error or not, is passed through unchanged.
    pub fn scoped<T, F>(mut self, f: F) -> Result<T, HtsError>
    where
        F: FnOnce(&mut Self) -> Result<T, HtsError>,
    {
        let result = f(&mut self);
        self.close();
        result
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, or after an earlier
    /// decode error, and [`HtsError::ReaderClosed`] after [`Reader::close()`].
    pub fn read_record(&mut self) -> Result<Option<D::Record>, HtsError> {
        match self.state {
            ReaderState::Closed => return Err(HtsError::ReaderClosed),
            ReaderState::Exhausted | ReaderState::Failed => return Ok(None),
            ReaderState::Unopened | ReaderState::Open => {}
        }
        let stream = self.stream.as_mut().ok_or(HtsError::ReaderClosed)?;
        match self.decoder.decode_next(stream.reader()) {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
            Err(e) => {
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    /// Release the stream and mark the reader closed. A stream opened from a
    /// path is closed; a borrowed handle is only released back to the
    /// caller. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == ReaderState::Closed {
            return;
        }
        // dropping the stream only closes files the reader opened itself
        self.stream = None;
        self.state = ReaderState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReaderState::Closed
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<'a, D: RecordDecoder + Default> Reader<'a, D> {
    /// Build a reader with default options from any path, path-like value,
    /// or borrowed handle.
    pub fn from_source(source: impl Into<Source<'a>>) -> Result<Self, HtsError> {
        Self::new(source, D::default())
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, HtsError> {
        Self::new(Source::Path(path.into()), D::default())
    }
}

impl<D: RecordDecoder> Iterator for Reader<'_, D> {
    type Item = Result<D::Record, HtsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

impl<D: RecordDecoder> Drop for Reader<'_, D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::tokenizer::LineTokenizer;
    use crate::test_utilities::temp_file_with;
    use std::io::Cursor;

    /// Yields each line as a record; a line reading "bad" is an error.
    #[derive(Default)]
    struct LineDecoder {
        tokenizer: LineTokenizer,
    }

    impl RecordDecoder for LineDecoder {
        type Record = String;

        fn decode_next(&mut self, reader: &mut dyn BufRead) -> Result<Option<String>, HtsError> {
            match self.tokenizer.next_line(reader, false)? {
                Some(line) if line == "bad" => Err(HtsError::FastaFormat(
                    self.tokenizer.line_number(),
                    "bad line".to_string(),
                )),
                other => Ok(other),
            }
        }
    }

    #[test]
    fn test_iteration_is_single_pass() {
        let mut handle = Cursor::new(b"a\nb\n".to_vec());
        let mut reader = Reader::new(&mut handle, LineDecoder::default()).unwrap();
        assert_eq!(reader.state(), ReaderState::Open);
        let lines: Vec<String> = reader.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_decode_error_ends_iteration() {
        let mut handle = Cursor::new(b"a\nbad\nc\n".to_vec());
        let mut reader = Reader::new(&mut handle, LineDecoder::default()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), "a");
        assert!(matches!(reader.next(), Some(Err(HtsError::FastaFormat(2, _)))));
        assert_eq!(reader.state(), ReaderState::Failed);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_closed_reader_errors() {
        let file = temp_file_with(b"a\nb\n");
        let mut reader = Reader::new(file.path(), LineDecoder::default()).unwrap();
        assert_eq!(reader.ownership(), Ownership::Owned);
        reader.close();
        assert!(reader.is_closed());
        reader.close();
        assert!(matches!(reader.read_record(), Err(HtsError::ReaderClosed)));
        assert!(matches!(reader.next(), Some(Err(HtsError::ReaderClosed))));
    }

    #[test]
    fn test_scoped_propagates_error_and_closes() {
        let mut handle = Cursor::new(b"a\nb\n".to_vec());
        let result: Result<(), HtsError> =
            Reader::open_scoped(&mut handle, LineDecoder::default(), |reader| {
                reader.next().transpose()?;
                Err(HtsError::MissingTag("XX".to_string()))
            });
        assert!(matches!(result, Err(HtsError::MissingTag(tag)) if tag == "XX"));
        // the borrowed handle is still usable
        handle.set_position(0);
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut handle, &mut contents).unwrap();
        assert_eq!(contents, "a\nb\n");
    }
}
