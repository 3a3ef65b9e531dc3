//! SAM text parsing: `@SQ` header lines and tab-delimited alignment lines.

use bytes::Bytes;
use std::str::FromStr;

use super::{tags, ReferenceResolver};
use crate::error::HtsError;
use crate::records::{Alignment, CigarKind, CigarOp, Tags};
use crate::Position;

/// Number of mandatory columns in an alignment line.
pub const MANDATORY_COLUMNS: usize = 11;

fn parse_field<T: FromStr>(value: &str, column: &str, line_number: usize) -> Result<T, HtsError> {
    value.parse::<T>().map_err(|_| {
        HtsError::SamFormat(line_number, format!("invalid {} '{}'", column, value))
    })
}

/// Parse an `@SQ` line into a reference name and length.
pub fn parse_sq_line(line: &str, line_number: usize) -> Result<(String, Position), HtsError> {
    let mut name = None;
    let mut length = None;
    for field in line.trim_end().split('\t').skip(1) {
        if let Some(value) = field.strip_prefix("SN:") {
            name = Some(value.to_string());
        } else if let Some(value) = field.strip_prefix("LN:") {
            length = Some(parse_field::<Position>(value, "LN", line_number)?);
        }
    }
    match (name, length) {
        (Some(name), Some(length)) => Ok((name, length)),
        _ => Err(HtsError::SamFormat(
            line_number,
            "@SQ line needs both SN and LN".to_string(),
        )),
    }
}

/// Parse a SAM CIGAR string; `*` is an empty CIGAR.
pub fn parse_cigar(cigar: &str, line_number: usize) -> Result<Vec<CigarOp>, HtsError> {
    if cigar == "*" {
        return Ok(Vec::new());
    }
    let error = || HtsError::SamFormat(line_number, format!("invalid CIGAR '{}'", cigar));
    let mut ops = Vec::new();
    let mut start = 0;
    for (i, c) in cigar.bytes().enumerate() {
        if c.is_ascii_digit() {
            continue;
        }
        let kind = CigarKind::from_char(c).ok_or_else(error)?;
        let len = cigar[start..i].parse().map_err(|_| error())?;
        ops.push(CigarOp::new(kind, len));
        start = i + 1;
    }
    if start != cigar.len() {
        return Err(error());
    }
    Ok(ops)
}

/// Parse one alignment line (without its terminator).
pub fn parse_sam_line(
    line: &str,
    line_number: usize,
    resolver: &ReferenceResolver,
) -> Result<Alignment, HtsError> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < MANDATORY_COLUMNS {
        return Err(HtsError::SamFormat(
            line_number,
            format!(
                "expected at least {} columns, found {}",
                MANDATORY_COLUMNS,
                columns.len()
            ),
        ));
    }

    let flags = parse_field::<u16>(columns[1], "FLAG", line_number)?;

    let (reference_id, reference_name) = match columns[2] {
        "*" => (None, None),
        name => (resolver.resolve_name(name)?, Some(name.to_string())),
    };
    let position = one_based(parse_field(columns[3], "POS", line_number)?);
    let mapq = parse_field::<u8>(columns[4], "MAPQ", line_number)?;
    let cigar = parse_cigar(columns[5], line_number)?;

    let (mate_reference_id, mate_reference_name) = match columns[6] {
        "*" => (None, None),
        "=" => (reference_id, reference_name.clone()),
        name => (resolver.resolve_mate_name(name), Some(name.to_string())),
    };
    let mate_position = one_based(parse_field(columns[7], "PNEXT", line_number)?);
    let template_length = parse_field::<i32>(columns[8], "TLEN", line_number)?;

    let seq = match columns[9] {
        "*" => Bytes::new(),
        seq => Bytes::copy_from_slice(seq.as_bytes()),
    };
    let qual = match columns[10] {
        "*" => None,
        qual => {
            if !seq.is_empty() && qual.len() != seq.len() {
                return Err(HtsError::QualityLengthMismatch {
                    name: columns[0].to_string(),
                    seq_len: seq.len(),
                    qual_len: qual.len(),
                });
            }
            let scores = qual
                .bytes()
                .map(|c| {
                    c.checked_sub(33)
                        .ok_or(HtsError::InvalidQuality(c as char, "phred"))
                })
                .collect::<Result<Vec<u8>, HtsError>>()?;
            Some(scores)
        }
    };

    let mut tags = Tags::new();
    for field in &columns[MANDATORY_COLUMNS..] {
        let (tag, value) = tags::parse_sam_tag(field, line_number)?;
        tags.insert(tag, value);
    }

    Ok(Alignment {
        read_name: columns[0].to_string(),
        flags,
        reference_id,
        reference_name,
        position,
        mapq,
        cigar,
        mate_reference_id,
        mate_reference_name,
        mate_position,
        template_length,
        seq,
        qual,
        tags,
    })
}

/// SAM positions are 1-based with 0 meaning unavailable.
fn one_based(pos: Position) -> Option<Position> {
    pos.checked_sub(1)
}
