//! Input handling with [`Source`] and [`InputStream`].
//!
//! These types abstract over where bytes come from (a path the reader opens
//! itself, or a handle the caller already opened) and how they are encoded
//! (plaintext or gzip-compressed, including BGZF), so that decoders only
//! ever see a plain buffered byte stream.

use flate2::bufread::MultiGzDecoder;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::HtsError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where a reader gets its bytes from.
///
/// Paths (anything convertible to a [`PathBuf`]) are opened by the reader
/// and owned by it. Handles are borrowed: the reader reads through them but
/// never closes them, so the caller can keep using a handle after the
/// reader is gone.
pub enum Source<'a> {
    Path(PathBuf),
    Handle(&'a mut dyn Read),
}

impl<'a> Source<'a> {
    /// Borrow an already-open handle.
    pub fn handle<R: Read>(handle: &'a mut R) -> Self {
        Source::Handle(handle)
    }

    /// A short description, for error messages and logging.
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Handle(_) => "<handle>".to_string(),
        }
    }
}

impl std::fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Handle(_) => f.debug_tuple("Handle").finish_non_exhaustive(),
        }
    }
}

impl From<PathBuf> for Source<'_> {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&PathBuf> for Source<'_> {
    fn from(path: &PathBuf) -> Self {
        Source::Path(path.clone())
    }
}

impl From<&Path> for Source<'_> {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<&str> for Source<'_> {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<String> for Source<'_> {
    fn from(path: String) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl<'a, R: Read> From<&'a mut R> for Source<'a> {
    fn from(handle: &'a mut R) -> Self {
        Source::Handle(handle)
    }
}

/// Whether the stream belongs to the reader (and is released on close), or
/// to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

/// The container encoding detected on the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// A resolved, readable, decompressed byte stream.
pub struct InputStream<'a> {
    reader: Box<dyn BufRead + 'a>,
    ownership: Ownership,
    compression: Compression,
    description: String,
}

impl std::fmt::Debug for InputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("ownership", &self.ownership)
            .field("compression", &self.compression)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<'a> InputStream<'a> {
    /// Resolve a [`Source`] into a readable stream.
    ///
    /// The raw stream is probed with a single buffered read before anything
    /// else happens. If the probe fails (the path is a directory, the handle
    /// was opened write-only, ...), this returns [`HtsError::NotReadable`].
    /// The probed bytes are also used to sniff the gzip magic number; gzip
    /// input is wrapped in a multi-member decoder so BGZF works too.
    pub fn open(source: impl Into<Source<'a>>) -> Result<Self, HtsError> {
        let source = source.into();
        let description = source.describe();
        let (raw, ownership): (Box<dyn Read + 'a>, Ownership) = match source {
            Source::Path(path) => (Box::new(File::open(path)?), Ownership::Owned),
            Source::Handle(handle) => (Box::new(handle), Ownership::Borrowed),
        };
        let mut raw = BufReader::new(raw);

        let is_gzipped = match raw.fill_buf() {
            Ok(buffer) => buffer.starts_with(&GZIP_MAGIC),
            Err(e) => return Err(HtsError::NotReadable(format!("{}: {}", description, e))),
        };

        let (reader, compression): (Box<dyn BufRead + 'a>, Compression) = if is_gzipped {
            (
                Box::new(BufReader::new(MultiGzDecoder::new(raw))),
                Compression::Gzip,
            )
        } else {
            (Box::new(raw), Compression::None)
        };
        debug!(
            "opened {} ({:?}, {:?})",
            description, ownership, compression
        );

        Ok(Self {
            reader,
            ownership,
            compression,
            description,
        })
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The decompressed stream.
    pub fn reader(&mut self) -> &mut dyn BufRead {
        &mut *self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{gzip_bytes, temp_file_with};
    use std::fs::OpenOptions;
    use std::io::Cursor;

    fn read_all(mut stream: InputStream) -> String {
        let mut contents = String::new();
        stream.reader().read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn test_path_is_owned() {
        let file = temp_file_with(b">seq\nACGT\n");
        let stream = InputStream::open(file.path()).unwrap();
        assert_eq!(stream.ownership(), Ownership::Owned);
        assert_eq!(stream.compression(), Compression::None);
        assert_eq!(read_all(stream), ">seq\nACGT\n");
    }

    #[test]
    fn test_handle_is_borrowed() {
        let input = b"@r\nA\n+\nI\n";
        let mut cursor = Cursor::new(input.to_vec());
        let stream = InputStream::open(&mut cursor).unwrap();
        assert_eq!(stream.ownership(), Ownership::Borrowed);
        assert_eq!(read_all(stream), "@r\nA\n+\nI\n");
        // the caller still has its handle
        assert_eq!(cursor.position(), input.len() as u64);
    }

    #[test]
    fn test_gzip_is_sniffed() {
        let compressed = gzip_bytes(b"chr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1\n");
        let file = temp_file_with(&compressed);
        let stream = InputStream::open(file.path()).unwrap();
        assert_eq!(stream.compression(), Compression::Gzip);
        assert_eq!(read_all(stream), "chr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1\n");

        let mut handle = Cursor::new(compressed);
        let stream = InputStream::open(&mut handle).unwrap();
        assert_eq!(stream.compression(), Compression::Gzip);
    }

    #[test]
    fn test_multi_member_gzip() {
        let mut compressed = gzip_bytes(b"line one\n");
        compressed.extend(gzip_bytes(b"line two\n"));
        let mut handle = Cursor::new(compressed);
        let stream = InputStream::open(&mut handle).unwrap();
        assert_eq!(read_all(stream), "line one\nline two\n");
    }

    #[test]
    fn test_directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let result = InputStream::open(dir.path());
        assert!(matches!(result, Err(HtsError::NotReadable(_))));
    }

    #[test]
    fn test_write_only_handle_is_not_readable() {
        let file = temp_file_with(b"ACGT");
        let mut handle = OpenOptions::new().write(true).open(file.path()).unwrap();
        let result = InputStream::open(&mut handle);
        assert!(matches!(result, Err(HtsError::NotReadable(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = InputStream::open("tests_data/does_not_exist.fa");
        assert!(matches!(result, Err(HtsError::IOError(_))));
    }
}
