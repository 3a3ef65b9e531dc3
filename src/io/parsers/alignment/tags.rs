//! Optional field (tag) parsing, for both the BAM binary and the SAM
//! `TAG:TYPE:VALUE` encodings.

use super::bam::BlockCursor;
use crate::error::HtsError;
use crate::records::{TagCode, TagValue, Tags};

/// Parse the tag section at the end of a BAM record block.
pub fn parse_bam_tags(bytes: &[u8]) -> Result<Tags, HtsError> {
    let mut cursor = BlockCursor::new(bytes);
    let mut tags = Tags::new();
    while !cursor.is_empty() {
        let code = cursor.take(2)?;
        let tag = TagCode([code[0], code[1]]);
        let value_type = cursor.u8()? as char;
        let value = parse_bam_value(&mut cursor, value_type, tag)?;
        tags.insert(tag, value);
    }
    Ok(tags)
}

fn parse_bam_value(
    cursor: &mut BlockCursor,
    value_type: char,
    tag: TagCode,
) -> Result<TagValue, HtsError> {
    let value = match value_type {
        'A' => TagValue::Character(cursor.u8()? as char),
        'c' => TagValue::Integer(cursor.i8()? as i64),
        'C' => TagValue::Integer(cursor.u8()? as i64),
        's' => TagValue::Integer(cursor.i16()? as i64),
        'S' => TagValue::Integer(cursor.u16()? as i64),
        'i' => TagValue::Integer(cursor.i32()? as i64),
        'I' => TagValue::Integer(cursor.u32()? as i64),
        'f' => TagValue::Float(cursor.f32()?),
        'Z' => TagValue::String(cursor.c_str()?.to_string()),
        'H' => TagValue::Hex(decode_hex(cursor.c_str()?, tag)?),
        'B' => {
            let subtype = cursor.u8()? as char;
            let count = cursor.u32()? as usize;
            if subtype == 'f' {
                let values = (0..count)
                    .map(|_| cursor.f32())
                    .collect::<Result<_, _>>()?;
                TagValue::FloatArray(values)
            } else {
                let values = (0..count)
                    .map(|_| match parse_bam_value(cursor, subtype, tag)? {
                        TagValue::Integer(value) => Ok(value),
                        _ => Err(HtsError::UnknownTagType(subtype, tag.to_string())),
                    })
                    .collect::<Result<_, _>>()?;
                TagValue::IntegerArray(values)
            }
        }
        other => return Err(HtsError::UnknownTagType(other, tag.to_string())),
    };
    Ok(value)
}

fn decode_hex(hex: &str, tag: TagCode) -> Result<Vec<u8>, HtsError> {
    if hex.len() % 2 != 0 {
        return Err(HtsError::BamFormat(format!("odd-length hex value for tag {}", tag)));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                .ok_or_else(|| HtsError::BamFormat(format!("invalid hex value for tag {}", tag)))
        })
        .collect()
}

/// Parse one SAM optional field, e.g. `NM:i:0` or `XA:B:f,0.5,1.5`.
pub fn parse_sam_tag(field: &str, line_number: usize) -> Result<(TagCode, TagValue), HtsError> {
    let error = || HtsError::SamFormat(line_number, format!("malformed optional field '{}'", field));

    let mut parts = field.splitn(3, ':');
    let (Some(tag), Some(value_type), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(error());
    };
    let tag = TagCode::try_from(tag).map_err(|_| error())?;
    let mut type_chars = value_type.chars();
    let (Some(value_type), None) = (type_chars.next(), type_chars.next()) else {
        return Err(error());
    };

    let value = match value_type {
        'A' => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => TagValue::Character(c),
                _ => return Err(error()),
            }
        }
        'i' => TagValue::Integer(value.parse().map_err(|_| error())?),
        'f' => TagValue::Float(value.parse().map_err(|_| error())?),
        'Z' => TagValue::String(value.to_string()),
        'H' => TagValue::Hex(decode_hex(value, tag).map_err(|_| error())?),
        'B' => {
            let (subtype, values) = value.split_once(',').unwrap_or((value, ""));
            let values: Vec<&str> = if values.is_empty() {
                Vec::new()
            } else {
                values.split(',').collect()
            };
            match subtype {
                "f" => TagValue::FloatArray(
                    values
                        .iter()
                        .map(|v| v.parse().map_err(|_| error()))
                        .collect::<Result<_, _>>()?,
                ),
                "c" | "C" | "s" | "S" | "i" | "I" => TagValue::IntegerArray(
                    values
                        .iter()
                        .map(|v| v.parse().map_err(|_| error()))
                        .collect::<Result<_, _>>()?,
                ),
                _ => return Err(HtsError::UnknownTagType('B', field.to_string())),
            }
        }
        other => return Err(HtsError::UnknownTagType(other, tag.to_string())),
    };
    Ok((tag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bam_scalar_tags() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"NMC\x00");
        bytes.extend_from_slice(b"XSs");
        bytes.extend_from_slice(&(-3i16).to_le_bytes());
        bytes.extend_from_slice(b"RGZgrp1\0");
        bytes.extend_from_slice(b"XAAq");
        bytes.extend_from_slice(b"XFf");
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(b"XHH1AFF\0");

        let tags = parse_bam_tags(&bytes).unwrap();
        assert_eq!(tags.len(), 6);
        assert_eq!(tags.get("NM"), Some(&TagValue::Integer(0)));
        assert_eq!(tags.get("XS"), Some(&TagValue::Integer(-3)));
        assert_eq!(tags.get("RG").and_then(|v| v.as_str()), Some("grp1"));
        assert_eq!(tags.get("XA"), Some(&TagValue::Character('q')));
        assert_eq!(tags.get("XF").and_then(|v| v.as_float()), Some(1.5));
        assert_eq!(tags.get("XH"), Some(&TagValue::Hex(vec![0x1a, 0xff])));
    }

    #[test]
    fn test_bam_array_tags() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ZBBs");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&(-1i16).to_le_bytes());
        bytes.extend_from_slice(&7i16.to_le_bytes());
        bytes.extend_from_slice(b"ZFBf");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0.25f32.to_le_bytes());

        let tags = parse_bam_tags(&bytes).unwrap();
        assert_eq!(tags.get("ZB"), Some(&TagValue::IntegerArray(vec![-1, 7])));
        assert_eq!(tags.get("ZF"), Some(&TagValue::FloatArray(vec![0.25])));
    }

    #[test]
    fn test_bam_bad_tags() {
        assert!(matches!(
            parse_bam_tags(b"XXq\x01"),
            Err(HtsError::UnknownTagType('q', tag)) if tag == "XX"
        ));
        assert!(matches!(
            parse_bam_tags(b"XXi\x01\x00"),
            Err(HtsError::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_sam_tags() {
        assert_eq!(
            parse_sam_tag("NM:i:0", 1).unwrap(),
            (TagCode(*b"NM"), TagValue::Integer(0))
        );
        assert_eq!(
            parse_sam_tag("CO:Z:has:colons", 1).unwrap().1,
            TagValue::String("has:colons".to_string())
        );
        assert_eq!(
            parse_sam_tag("XB:B:c,-1,2", 1).unwrap().1,
            TagValue::IntegerArray(vec![-1, 2])
        );
        assert_eq!(
            parse_sam_tag("XF:B:f,0.5", 1).unwrap().1,
            TagValue::FloatArray(vec![0.5])
        );
        assert!(matches!(parse_sam_tag("NM:i", 7), Err(HtsError::SamFormat(7, _))));
        assert!(matches!(parse_sam_tag("NM:i:x", 7), Err(HtsError::SamFormat(7, _))));
        assert!(matches!(
            parse_sam_tag("NM:q:1", 7),
            Err(HtsError::UnknownTagType('q', _))
        ));
    }
}
