//! Splitting decompressed streams into the chunks decoders work on.
//!
//! Text formats are consumed line by line through [`LineTokenizer`]. BAM is
//! consumed through [`BlockTokenizer`], which reads the binary preamble and
//! then one length-prefixed record block at a time.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, BufRead, Read};

use crate::error::HtsError;

/// Initial capacity for line buffers.
pub const PARSE_CAPACITY: usize = 512;

/// A line reader with one line of push-back and a line counter.
#[derive(Debug, Default)]
pub struct LineTokenizer {
    pending: Option<String>,
    line_number: usize,
    buffer: Vec<u8>,
}

impl LineTokenizer {
    pub fn new() -> Self {
        Self {
            pending: None,
            line_number: 0,
            buffer: Vec::with_capacity(PARSE_CAPACITY),
        }
    }

    /// The 1-based number of the last line returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line, or `None` at the end of the stream. A final line
    /// without a terminator is still returned. With `keep_terminator`,
    /// the `\n` (or `\r\n`) is left on the line, so that concatenating all
    /// lines reproduces the input exactly.
    pub fn next_line(
        &mut self,
        reader: &mut dyn BufRead,
        keep_terminator: bool,
    ) -> Result<Option<String>, HtsError> {
        if let Some(line) = self.pending.take() {
            self.line_number += 1;
            return Ok(Some(finish_line(line, keep_terminator)));
        }

        self.buffer.clear();
        if reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let line = String::from_utf8(std::mem::take(&mut self.buffer))
            .map_err(|e| HtsError::Utf8Error(e.utf8_error()))?;
        Ok(Some(finish_line(line, keep_terminator)))
    }

    /// Return a line (as read with `keep_terminator = true`) to the
    /// tokenizer; the next call to [`LineTokenizer::next_line()`] yields it
    /// again.
    pub fn push_back(&mut self, line: String) {
        debug_assert!(self.pending.is_none());
        self.line_number -= 1;
        self.pending = Some(line);
    }
}

fn finish_line(mut line: String, keep_terminator: bool) -> String {
    if !keep_terminator {
        strip_terminator(&mut line);
    }
    line
}

/// Remove a trailing `\n` or `\r\n` in place.
pub fn strip_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// BAM magic bytes.
pub const BAM_MAGIC: &[u8; 4] = b"BAM\x01";

/// Reads the BAM binary layout: magic, header text, reference entries, then
/// record blocks.
///
/// Record boundaries come only from each block's 4-byte length prefix, so a
/// record's tag area never has to be understood to find the next record.
#[derive(Debug, Default)]
pub struct BlockTokenizer {
    buffer: Vec<u8>,
    blocks_read: usize,
}

impl BlockTokenizer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(PARSE_CAPACITY),
            blocks_read: 0,
        }
    }

    /// Whether the stream starts with the BAM magic bytes. Nothing is
    /// consumed.
    pub fn is_bam(reader: &mut dyn BufRead) -> Result<bool, HtsError> {
        Ok(reader.fill_buf()?.starts_with(BAM_MAGIC))
    }

    /// Read and check the magic bytes, then return the header text.
    pub fn read_header_text(&mut self, reader: &mut dyn BufRead) -> Result<String, HtsError> {
        let mut magic = [0u8; 4];
        read_exact_or_truncated(reader, &mut magic)?;
        if &magic != BAM_MAGIC {
            return Err(HtsError::BamFormat(format!(
                "invalid magic: expected {:?}, got {:?}",
                BAM_MAGIC, magic
            )));
        }
        let text = self.read_sized_bytes(reader)?;
        // header text may be NUL-padded
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        Ok(std::str::from_utf8(&text[..end])?.to_string())
    }

    /// Read the reference dictionary: `n_ref`, then `n_ref` entries of
    /// (`l_name`, NUL-terminated name, `l_ref`).
    pub fn read_references(
        &mut self,
        reader: &mut dyn BufRead,
    ) -> Result<Vec<(String, u32)>, HtsError> {
        let n_ref = read_count(reader, "n_ref")?;
        let mut references = Vec::with_capacity(n_ref.min(1 << 16));
        for _ in 0..n_ref {
            let name = self.read_sized_bytes(reader)?;
            let name = match name.split_last() {
                Some((0, name)) => name,
                _ => {
                    return Err(HtsError::BamFormat(
                        "reference name is not NUL-terminated".to_string(),
                    ))
                }
            };
            let name = std::str::from_utf8(name)?.to_string();
            let length = read_count(reader, "l_ref")? as u32;
            references.push((name, length));
        }
        Ok(references)
    }

    /// Read the next record block, without its length prefix. Returns
    /// `None` on a clean end of stream (no bytes left before a prefix).
    pub fn next_block(&mut self, reader: &mut dyn BufRead) -> Result<Option<&[u8]>, HtsError> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        let block_size = read_count(reader, "block_size")?;
        read_sized_into(reader, block_size, &mut self.buffer)?;
        self.blocks_read += 1;
        Ok(Some(&self.buffer))
    }

    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }

    fn read_sized_bytes(&mut self, reader: &mut dyn BufRead) -> Result<Vec<u8>, HtsError> {
        let len = read_count(reader, "length")?;
        let mut bytes = Vec::new();
        read_sized_into(reader, len, &mut bytes)?;
        Ok(bytes)
    }
}

/// Read a little-endian `int32` that must be non-negative.
fn read_count(reader: &mut dyn BufRead, what: &str) -> Result<usize, HtsError> {
    let value = match reader.read_i32::<LittleEndian>() {
        Ok(value) => value,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(HtsError::TruncatedRecord {
                expected: 4,
                found: 0,
            })
        }
        Err(e) => return Err(e.into()),
    };
    usize::try_from(value).map_err(|_| HtsError::BamFormat(format!("negative {}: {}", what, value)))
}

/// Replace `buffer` with the next `expected` bytes. The buffer only grows
/// with the bytes actually read, so a corrupt length prefix fails as a
/// truncation instead of a huge allocation.
fn read_sized_into(
    reader: &mut dyn BufRead,
    expected: usize,
    buffer: &mut Vec<u8>,
) -> Result<(), HtsError> {
    buffer.clear();
    let found = Read::take(&mut *reader, expected as u64).read_to_end(buffer)?;
    if found < expected {
        return Err(HtsError::TruncatedRecord { expected, found });
    }
    Ok(())
}

fn read_exact_or_truncated(reader: &mut dyn BufRead, buffer: &mut [u8]) -> Result<(), HtsError> {
    let expected = buffer.len();
    let mut found = 0;
    while found < expected {
        match reader.read(&mut buffer[found..]) {
            Ok(0) => return Err(HtsError::TruncatedRecord { expected, found }),
            Ok(n) => found += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::BamBuilder;
    use std::io::Cursor;

    #[test]
    fn test_lines_strip_terminators() {
        let mut reader = Cursor::new(b"one\r\ntwo\nthree".to_vec());
        let mut tokenizer = LineTokenizer::new();
        assert_eq!(tokenizer.next_line(&mut reader, false).unwrap().unwrap(), "one");
        assert_eq!(tokenizer.next_line(&mut reader, false).unwrap().unwrap(), "two");
        assert_eq!(tokenizer.next_line(&mut reader, false).unwrap().unwrap(), "three");
        assert_eq!(tokenizer.line_number(), 3);
        assert!(tokenizer.next_line(&mut reader, false).unwrap().is_none());
    }

    #[test]
    fn test_lines_keep_terminators_and_push_back() {
        let mut reader = Cursor::new(b">a\nAC\n>b\n".to_vec());
        let mut tokenizer = LineTokenizer::new();
        let first = tokenizer.next_line(&mut reader, true).unwrap().unwrap();
        assert_eq!(first, ">a\n");
        tokenizer.push_back(first);
        assert_eq!(tokenizer.line_number(), 0);
        assert_eq!(tokenizer.next_line(&mut reader, false).unwrap().unwrap(), ">a");
        assert_eq!(tokenizer.next_line(&mut reader, true).unwrap().unwrap(), "AC\n");
        assert_eq!(tokenizer.line_number(), 2);
    }

    #[test]
    fn test_blocks_follow_length_prefix() {
        let bytes = BamBuilder::new()
            .reference("chr1", 1000)
            .raw_block(vec![1, 2, 3])
            .raw_block(vec![9; 40])
            .build();
        let mut reader = Cursor::new(bytes);
        let mut tokenizer = BlockTokenizer::new();
        assert!(BlockTokenizer::is_bam(&mut reader).unwrap());
        tokenizer.read_header_text(&mut reader).unwrap();
        let refs = tokenizer.read_references(&mut reader).unwrap();
        assert_eq!(refs, vec![("chr1".to_string(), 1000)]);

        assert_eq!(tokenizer.next_block(&mut reader).unwrap().unwrap(), &[1, 2, 3]);
        assert_eq!(tokenizer.next_block(&mut reader).unwrap().unwrap().len(), 40);
        assert!(tokenizer.next_block(&mut reader).unwrap().is_none());
        assert_eq!(tokenizer.blocks_read(), 2);
    }

    #[test]
    fn test_truncated_block() {
        let mut bytes = 10i32.to_le_bytes().to_vec();
        bytes.extend([0u8; 4]);
        let mut reader = Cursor::new(bytes);
        let mut tokenizer = BlockTokenizer::new();
        assert!(matches!(
            tokenizer.next_block(&mut reader),
            Err(HtsError::TruncatedRecord {
                expected: 10,
                found: 4
            })
        ));
    }

    #[test]
    fn test_oversized_length_prefix() {
        let mut bytes = i32::MAX.to_le_bytes().to_vec();
        bytes.extend([1u8, 2, 3]);
        let mut reader = Cursor::new(bytes);
        let mut tokenizer = BlockTokenizer::new();
        let result = tokenizer.next_block(&mut reader).map(|block| block.map(<[u8]>::len));
        assert!(matches!(
            result,
            Err(HtsError::TruncatedRecord { expected, found: 3 }) if expected == i32::MAX as usize
        ));
        assert!(tokenizer.buffer.capacity() < 1 << 20);

        let mut bytes = BAM_MAGIC.to_vec();
        bytes.extend(i32::MAX.to_le_bytes());
        bytes.extend(b"@HD");
        let mut reader = Cursor::new(bytes);
        assert!(matches!(
            tokenizer.read_header_text(&mut reader),
            Err(HtsError::TruncatedRecord { found: 3, .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut reader = Cursor::new(b"BAM\x02\0\0\0\0".to_vec());
        let mut tokenizer = BlockTokenizer::new();
        assert!(!BlockTokenizer::is_bam(&mut reader).unwrap());
        assert!(matches!(
            tokenizer.read_header_text(&mut reader),
            Err(HtsError::BamFormat(_))
        ));
    }
}
