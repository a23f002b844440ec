use thiserror::Error;

use crate::buffer::ByteBufferError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CborError {
    #[error("Unexpected end of CBOR data: {0}")]
    Buffer(#[from] ByteBufferError),

    #[error("Unused bytes after CBOR data: {0} bytes remaining")]
    TrailingBytes(usize),

    #[error("Reserved additional information value {0}")]
    ReservedInfo(u8),

    #[error("Indefinite length items are not supported")]
    IndefiniteLength,

    #[error("CBOR tags are not supported (tag {0})")]
    UnsupportedTag(u64),

    #[error("Invalid simple value encoding: {0}")]
    InvalidSimpleValue(u8),

    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("Unsupported map key type: {0}")]
    InvalidMapKey(String),

    #[error("Duplicate map key: {0}")]
    DuplicateKey(String),

    #[error("Declared length {0} exceeds the available data")]
    LengthOverflow(u64),

    #[error("Maximum nesting depth of {0} exceeded")]
    NestingTooDeep(usize),
}
