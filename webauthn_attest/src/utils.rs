use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Invalid format: {0}")]
    Format(String),
}

pub fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    // Some clients keep the padding
    let decoded = URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    STANDARD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64".to_string()))
}

pub(crate) fn base64_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Constant-time comparison; slices of different length compare unequal.
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_round_trip_and_padding() {
        let data = b"\xfb\xff\x00hello";
        let encoded = base64url_encode(data);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert_eq!(base64url_decode(&encoded).unwrap(), data);
        assert_eq!(base64url_decode("YQ==").unwrap(), b"a");
        assert!(base64url_decode("not base64!").is_err());
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256(b"abc")[..4],
            [0xba, 0x78, 0x16, 0xbf],
        );
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq(b"abc", b"abc"));
        assert!(!ct_eq(b"abc", b"abd"));
        assert!(!ct_eq(b"abc", b"ab"));
    }
}
