use crate::buffer::ByteBuffer;
use crate::cbor::{self, CborValue};
use crate::errors::WebauthnError;

/// Start of an EdDSA key as emitted by some early authenticators:
/// `{1: "OKP", 3: -8, -1: 6, -2: [ <32 uints> ]}` with the key type as a text
/// string and the x coordinate as an array of byte values.
const BROKEN_OKP_PREFIX: [u8; 13] = [
    0xa4, // map(4)
    0x01, 0x63, b'O', b'K', b'P', // 1: "OKP"
    0x03, 0x27, // 3: -8
    0x20, 0x06, // -1: 6
    0x21, 0x98, 0x20, // -2: array(32)
];

/// Corrected prefix: `{1: 1, 3: -8, -1: 6, -2: bytes(32)}`.
const FIXED_OKP_PREFIX: [u8; 10] = [0xa4, 0x01, 0x01, 0x03, 0x27, 0x20, 0x06, 0x21, 0x58, 0x20];

const ED25519_KEY_LEN: usize = 32;

/// Rewrites the broken OKP encoding into a well-formed COSE key.
///
/// Returns `None` when the bytes at `offset` do not start with the exact
/// broken prefix. Otherwise returns the corrected key bytes and the offset
/// just past the broken key in the original buffer.
pub(super) fn repair_broken_okp_key(
    buffer: &ByteBuffer,
    offset: usize,
) -> Result<Option<(ByteBuffer, usize)>, WebauthnError> {
    match buffer.get_slice(offset, BROKEN_OKP_PREFIX.len()) {
        Ok(prefix) if prefix == BROKEN_OKP_PREFIX => {}
        _ => return Ok(None),
    }

    tracing::warn!("Repairing malformed OKP COSE key encoding");

    let mut fixed = Vec::with_capacity(FIXED_OKP_PREFIX.len() + ED25519_KEY_LEN);
    fixed.extend_from_slice(&FIXED_OKP_PREFIX);

    let mut position = offset + BROKEN_OKP_PREFIX.len();
    for _ in 0..ED25519_KEY_LEN {
        let (item, next) = cbor::decode_in_place(buffer, position)?;
        let byte = match item {
            CborValue::Unsigned(n) => u8::try_from(n).ok(),
            _ => None,
        }
        .ok_or_else(|| {
            WebauthnError::Parse("Malformed OKP key: x coordinate item is not a byte".to_string())
        })?;
        fixed.push(byte);
        position = next;
    }

    Ok(Some((ByteBuffer::new(fixed), position)))
}
