use crate::buffer::ByteBuffer;
use crate::cbor::{self, CborMap, CborMapKey, CborValue};
use crate::errors::WebauthnError;

use super::algorithm::CoseAlgorithm;
use super::compat::repair_broken_okp_key;
use super::der::pem_encode;
use super::ec2::Ec2Key;
use super::labels::{ALG, BASE_IV, KEY_OPS, KID, KTY, KTY_EC2, KTY_OKP, KTY_RSA};
use super::okp::OkpKey;
use super::rsa::RsaKey;

const COMMON_LABELS: [i64; 5] = [KTY, KID, ALG, KEY_OPS, BASE_IV];

/// A credential or attestation public key decoded from a COSE_Key map.
///
/// Construction validates the field set strictly: every label must be one of
/// the common parameters or a parameter of the key type, every value must
/// have the expected CBOR type and the algorithm must be one the key type
/// supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    Ec2(Ec2Key),
    Okp(OkpKey),
    Rsa(RsaKey),
}

impl CoseKey {
    /// Parses a COSE key that spans the whole buffer.
    pub fn parse(buffer: &ByteBuffer) -> Result<Self, WebauthnError> {
        let (key, end) = Self::parse_in_place(buffer, 0)?;
        if end != buffer.len() {
            return Err(WebauthnError::Parse(format!(
                "Unused bytes after COSE key: {} bytes remaining",
                buffer.len() - end
            )));
        }
        Ok(key)
    }

    /// Parses a COSE key embedded at `offset` and returns the offset just past
    /// it in the original buffer.
    pub fn parse_in_place(buffer: &ByteBuffer, offset: usize) -> Result<(Self, usize), WebauthnError> {
        if let Some((repaired, end)) = repair_broken_okp_key(buffer, offset)? {
            let value = cbor::decode(&repaired)?;
            return Ok((Self::from_cbor(&value)?, end));
        }
        let (value, end) = cbor::decode_in_place(buffer, offset)?;
        Ok((Self::from_cbor(&value)?, end))
    }

    pub fn from_cbor(value: &CborValue) -> Result<Self, WebauthnError> {
        let map = value.as_map().ok_or_else(|| {
            WebauthnError::Parse(format!("COSE key must be a map, got {}", value.type_name()))
        })?;
        Self::from_cbor_map(map)
    }

    pub fn from_cbor_map(map: &CborMap) -> Result<Self, WebauthnError> {
        let kty = required_int(map, KTY, "kty")?;
        let algorithm = CoseAlgorithm::try_from(required_int(map, ALG, "alg")?)?;
        check_common_parameters(map)?;

        match kty {
            KTY_EC2 => {
                check_labels(map, Ec2Key::LABELS)?;
                Ok(CoseKey::Ec2(Ec2Key::from_cbor_map(algorithm, map)?))
            }
            KTY_OKP => {
                check_labels(map, OkpKey::LABELS)?;
                Ok(CoseKey::Okp(OkpKey::from_cbor_map(algorithm, map)?))
            }
            KTY_RSA => {
                check_labels(map, RsaKey::LABELS)?;
                Ok(CoseKey::Rsa(RsaKey::from_cbor_map(algorithm, map)?))
            }
            other => Err(WebauthnError::Parse(format!(
                "Unsupported COSE key type: {other}"
            ))),
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            CoseKey::Ec2(key) => key.algorithm(),
            CoseKey::Okp(key) => key.algorithm(),
            CoseKey::Rsa(key) => key.algorithm(),
        }
    }

    /// Verifies `signature` over `message` with this key and its algorithm.
    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<bool, WebauthnError> {
        match self {
            CoseKey::Ec2(key) => key.verify_signature(message, signature),
            CoseKey::Okp(key) => key.verify_signature(message, signature),
            CoseKey::Rsa(key) => key.verify_signature(message, signature),
        }
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn as_der(&self) -> Vec<u8> {
        match self {
            CoseKey::Ec2(key) => key.as_der(),
            CoseKey::Okp(key) => key.as_der(),
            CoseKey::Rsa(key) => key.as_der(),
        }
    }

    pub fn as_pem(&self) -> String {
        pem_encode("PUBLIC KEY", &self.as_der())
    }

    pub fn to_cbor_map(&self) -> CborMap {
        let (kty, params) = match self {
            CoseKey::Ec2(key) => (KTY_EC2, key.parameters()),
            CoseKey::Okp(key) => (KTY_OKP, key.parameters()),
            CoseKey::Rsa(key) => (KTY_RSA, key.parameters()),
        };
        let mut map = CborMap::new()
            .with(KTY, CborValue::integer(kty))
            .with(ALG, CborValue::integer(self.algorithm().identifier()));
        for (label, value) in params {
            map.insert(label, value);
        }
        map.to_canonical()
    }

    /// Canonical CBOR encoding of the key.
    pub fn to_cbor(&self) -> Vec<u8> {
        cbor::encode(&CborValue::Map(self.to_cbor_map()))
    }
}

fn check_common_parameters(map: &CborMap) -> Result<(), WebauthnError> {
    if let Some(kid) = map.get_int(KID) {
        if kid.as_bytes().is_none() {
            return Err(WebauthnError::Parse(
                "COSE key kid must be a byte string".to_string(),
            ));
        }
    }
    if let Some(ops) = map.get_int(KEY_OPS) {
        if ops.as_array().is_none() {
            return Err(WebauthnError::Parse(
                "COSE key key_ops must be an array".to_string(),
            ));
        }
    }
    if let Some(iv) = map.get_int(BASE_IV) {
        if iv.as_bytes().is_none() {
            return Err(WebauthnError::Parse(
                "COSE key Base IV must be a byte string".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_labels(map: &CborMap, type_labels: &[i64]) -> Result<(), WebauthnError> {
    for key in map.keys() {
        let allowed = match key {
            CborMapKey::Int(label) => {
                COMMON_LABELS.contains(label) || type_labels.contains(label)
            }
            CborMapKey::Text(_) => false,
        };
        if !allowed {
            return Err(WebauthnError::Parse(format!(
                "Unexpected parameter {key} in COSE key"
            )));
        }
    }
    Ok(())
}

pub(super) fn required_int(map: &CborMap, label: i64, name: &str) -> Result<i64, WebauthnError> {
    map.get_int(label)
        .ok_or_else(|| WebauthnError::Parse(format!("COSE key is missing {name}")))?
        .as_i64()
        .ok_or_else(|| WebauthnError::Parse(format!("COSE key {name} must be an integer")))
}

pub(super) fn required_bytes<'a>(
    map: &'a CborMap,
    label: i64,
    name: &str,
) -> Result<&'a ByteBuffer, WebauthnError> {
    map.get_int(label)
        .ok_or_else(|| WebauthnError::Parse(format!("COSE key is missing {name}")))?
        .as_bytes()
        .ok_or_else(|| WebauthnError::Parse(format!("COSE key {name} must be a byte string")))
}
