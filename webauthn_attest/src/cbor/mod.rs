//! CBOR subset used by WebAuthn.
//!
//! Supports unsigned and negative integers, byte and text strings, arrays,
//! maps keyed by integers or text strings, floats, booleans, null and simple
//! values. Tags and indefinite-length items are rejected. Map encoding is
//! canonical (shorter encoded key first, then bytewise lexicographic).

mod decoder;
mod encoder;
mod errors;
mod value;

pub use decoder::{decode, decode_in_place};
pub use encoder::encode;
pub use errors::CborError;
pub use value::{CborMap, CborMapKey, CborValue};
