use crate::buffer::ByteBuffer;

use super::errors::CborError;
use super::value::{CborMap, CborMapKey, CborValue};

const MAX_NESTING_DEPTH: usize = 32;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// Decodes a single CBOR item that must span the entire buffer.
pub fn decode(buffer: &ByteBuffer) -> Result<CborValue, CborError> {
    let (value, end) = decode_in_place(buffer, 0)?;
    if end != buffer.len() {
        return Err(CborError::TrailingBytes(buffer.len() - end));
    }
    Ok(value)
}

/// Decodes one CBOR item starting at `offset` and returns it together with
/// the offset just past its last byte.
pub fn decode_in_place(buffer: &ByteBuffer, offset: usize) -> Result<(CborValue, usize), CborError> {
    parse_item(buffer, offset, 0)
}

fn parse_item(
    buffer: &ByteBuffer,
    offset: usize,
    depth: usize,
) -> Result<(CborValue, usize), CborError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CborError::NestingTooDeep(MAX_NESTING_DEPTH));
    }

    let initial = buffer.get_byte(offset)?;
    let major = initial >> 5;
    let info = initial & 0x1f;
    let offset = offset + 1;

    if major == MAJOR_SIMPLE {
        return parse_simple(buffer, offset, info);
    }

    let (argument, offset) = read_argument(buffer, offset, info)?;

    match major {
        MAJOR_UNSIGNED => Ok((CborValue::Unsigned(argument), offset)),
        MAJOR_NEGATIVE => Ok((CborValue::Negative(argument), offset)),
        MAJOR_BYTES => {
            let len = checked_length(buffer, offset, argument)?;
            Ok((CborValue::Bytes(buffer.get_bytes(offset, len)?), offset + len))
        }
        MAJOR_TEXT => {
            let len = checked_length(buffer, offset, argument)?;
            let text = std::str::from_utf8(buffer.get_slice(offset, len)?)
                .map_err(|_| CborError::InvalidUtf8)?;
            Ok((CborValue::Text(text.to_string()), offset + len))
        }
        MAJOR_ARRAY => {
            // every item takes at least one byte
            let count = checked_length(buffer, offset, argument)?;
            let mut items = Vec::with_capacity(count);
            let mut offset = offset;
            for _ in 0..count {
                let (item, next) = parse_item(buffer, offset, depth + 1)?;
                items.push(item);
                offset = next;
            }
            Ok((CborValue::Array(items), offset))
        }
        MAJOR_MAP => {
            let count = checked_length(buffer, offset, argument)?;
            let mut map = CborMap::new();
            let mut offset = offset;
            for _ in 0..count {
                let (key, next) = parse_item(buffer, offset, depth + 1)?;
                let key = CborMapKey::from_value(key)?;
                let (value, next) = parse_item(buffer, next, depth + 1)?;
                map.insert_unique(key, value)?;
                offset = next;
            }
            Ok((CborValue::Map(map), offset))
        }
        MAJOR_TAG => Err(CborError::UnsupportedTag(argument)),
        _ => unreachable!("major type is a 3-bit value"),
    }
}

fn read_argument(buffer: &ByteBuffer, offset: usize, info: u8) -> Result<(u64, usize), CborError> {
    match info {
        0..=23 => Ok((u64::from(info), offset)),
        24 => Ok((u64::from(buffer.get_byte(offset)?), offset + 1)),
        25 => Ok((u64::from(buffer.get_u16_be(offset)?), offset + 2)),
        26 => Ok((u64::from(buffer.get_u32_be(offset)?), offset + 4)),
        27 => Ok((buffer.get_u64_be(offset)?, offset + 8)),
        28..=30 => Err(CborError::ReservedInfo(info)),
        _ => Err(CborError::IndefiniteLength),
    }
}

/// Converts a declared length to `usize`, rejecting lengths larger than the
/// bytes left in the buffer before anything is allocated.
fn checked_length(buffer: &ByteBuffer, offset: usize, length: u64) -> Result<usize, CborError> {
    let remaining = buffer.len().saturating_sub(offset);
    match usize::try_from(length) {
        Ok(len) if len <= remaining => Ok(len),
        _ => Err(CborError::LengthOverflow(length)),
    }
}

fn parse_simple(buffer: &ByteBuffer, offset: usize, info: u8) -> Result<(CborValue, usize), CborError> {
    match info {
        0..=19 => Ok((CborValue::Simple(info), offset)),
        20 => Ok((CborValue::Bool(false), offset)),
        21 => Ok((CborValue::Bool(true), offset)),
        22 => Ok((CborValue::Null, offset)),
        23 => Ok((CborValue::Simple(23), offset)),
        24 => {
            let value = buffer.get_byte(offset)?;
            if value < 32 {
                return Err(CborError::InvalidSimpleValue(value));
            }
            Ok((CborValue::Simple(value), offset + 1))
        }
        25 => Ok((CborValue::Float(buffer.get_half_float(offset)?), offset + 2)),
        26 => Ok((CborValue::Float(f64::from(buffer.get_float(offset)?)), offset + 4)),
        27 => Ok((CborValue::Float(buffer.get_double(offset)?), offset + 8)),
        28..=30 => Err(CborError::ReservedInfo(info)),
        _ => Err(CborError::IndefiniteLength),
    }
}
