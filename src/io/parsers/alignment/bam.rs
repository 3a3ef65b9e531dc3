//! Decoding of a single BAM record block.
//!
//! ```text
//! block (after the 4-byte block_size prefix):
//! - refID        int32
//! - pos          int32     0-based, -1 if unavailable
//! - l_read_name  uint8     including the NUL
//! - mapq         uint8
//! - bin          uint16
//! - n_cigar_op   uint16
//! - flag         uint16
//! - l_seq        uint32
//! - next_refID   int32
//! - next_pos     int32
//! - tlen         int32
//! - read_name    char[l_read_name]
//! - cigar        uint32[n_cigar_op]   len << 4 | op
//! - seq          uint8[(l_seq + 1) / 2], 4 bits per base
//! - qual         char[l_seq], 0xff if unavailable
//! - tags         everything up to the end of the block
//! ```

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use super::{checked_position, tags, ReferenceResolver};
use crate::error::HtsError;
use crate::records::{Alignment, CigarKind, CigarOp, TagValue};

/// Size of the fixed-width part of a record.
pub const CORE_SIZE: usize = 32;

const ALPHABET: [u8; 16] = *b"=ACMGRSVTWYHKDBN";

/// A bounds-checked little-endian cursor over a record block.
#[derive(Debug)]
pub struct BlockCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BlockCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], HtsError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(HtsError::TruncatedRecord {
                expected: self.offset.saturating_add(len),
                found: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        slice
    }

    pub fn u8(&mut self) -> Result<u8, HtsError> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8, HtsError> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, HtsError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn i16(&mut self) -> Result<i16, HtsError> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32, HtsError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn i32(&mut self) -> Result<i32, HtsError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn f32(&mut self) -> Result<f32, HtsError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// A NUL-terminated string; the NUL is consumed but not returned.
    pub fn c_str(&mut self) -> Result<&'a str, HtsError> {
        let rest = &self.bytes[self.offset..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| HtsError::BamFormat("unterminated string".to_string()))?;
        let value = std::str::from_utf8(&rest[..len])?;
        self.offset += len + 1;
        Ok(value)
    }
}

/// Decode one record block into an [`Alignment`].
pub fn decode_record(block: &[u8], resolver: &ReferenceResolver) -> Result<Alignment, HtsError> {
    if block.len() < CORE_SIZE {
        return Err(HtsError::TruncatedRecord {
            expected: CORE_SIZE,
            found: block.len(),
        });
    }
    let mut cursor = BlockCursor::new(block);

    let ref_id = cursor.i32()?;
    let pos = cursor.i32()?;
    let l_read_name = cursor.u8()? as usize;
    let mapq = cursor.u8()?;
    let _bin = cursor.u16()?;
    let n_cigar_op = cursor.u16()? as usize;
    let flags = cursor.u16()?;
    let l_seq = cursor.u32()? as usize;
    let next_ref_id = cursor.i32()?;
    let next_pos = cursor.i32()?;
    let template_length = cursor.i32()?;

    let read_name = decode_read_name(cursor.take(l_read_name)?)?;
    let mut cigar = decode_cigar(cursor.take(n_cigar_op * 4)?)?;
    let seq = decode_sequence(cursor.take((l_seq + 1) / 2)?, l_seq);
    let qual = decode_qualities(cursor.take(l_seq)?);
    let mut tags = tags::parse_bam_tags(cursor.rest())?;

    // CIGARs too long for n_cigar_op are stored in the CG tag, with a
    // placeholder `<l_seq>S<ref_len>N` in the record itself
    let placeholder = matches!(
        cigar.as_slice(),
        [CigarOp { kind: CigarKind::SoftClip, len }, CigarOp { kind: CigarKind::Skip, .. }]
            if *len as usize == l_seq
    );
    if placeholder {
        if let Some(TagValue::IntegerArray(ops)) = tags.get("CG") {
            cigar = ops
                .iter()
                .map(|&op| decode_cigar_op(op as u32))
                .collect::<Result<_, _>>()?;
            tags.remove("CG");
        }
    }

    let (reference_id, reference_name) = resolver.resolve_id(ref_id)?;
    let (mate_reference_id, mate_reference_name) = resolver.resolve_mate_id(next_ref_id)?;

    Ok(Alignment {
        read_name,
        flags,
        reference_id,
        reference_name,
        position: checked_position(pos)?,
        mapq,
        cigar,
        mate_reference_id,
        mate_reference_name,
        mate_position: checked_position(next_pos)?,
        template_length,
        seq,
        qual,
        tags,
    })
}

fn decode_read_name(bytes: &[u8]) -> Result<String, HtsError> {
    let name = match bytes.split_last() {
        Some((0, name)) => name,
        _ => return Err(HtsError::BamFormat("read name is not NUL-terminated".to_string())),
    };
    Ok(std::str::from_utf8(name)?.to_string())
}

fn decode_cigar_op(op: u32) -> Result<CigarOp, HtsError> {
    let kind = CigarKind::from_bam_code(op & 0xf)
        .ok_or_else(|| HtsError::BamFormat(format!("invalid CIGAR operation {}", op & 0xf)))?;
    Ok(CigarOp::new(kind, op >> 4))
}

fn decode_cigar(bytes: &[u8]) -> Result<Vec<CigarOp>, HtsError> {
    bytes
        .chunks_exact(4)
        .map(|chunk| decode_cigar_op(LittleEndian::read_u32(chunk)))
        .collect()
}

/// Unpack 4-bit encoded bases, high nibble first.
fn decode_sequence(bytes: &[u8], l_seq: usize) -> Bytes {
    let mut seq = Vec::with_capacity(l_seq + 1);
    for &byte in bytes {
        seq.push(ALPHABET[(byte >> 4) as usize]);
        seq.push(ALPHABET[(byte & 0xf) as usize]);
    }
    seq.truncate(l_seq);
    Bytes::from(seq)
}

fn decode_qualities(bytes: &[u8]) -> Option<Vec<u8>> {
    match bytes.first() {
        None | Some(0xff) => None,
        Some(_) => Some(bytes.to_vec()),
    }
}
