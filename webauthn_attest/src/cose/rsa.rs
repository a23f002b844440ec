use crate::buffer::ByteBuffer;
use crate::cbor::{CborMap, CborValue};
use crate::crypto::{self, PublicKeyMaterial};
use crate::errors::WebauthnError;

use super::algorithm::CoseAlgorithm;
use super::der;
use super::key::required_bytes;
use super::labels::{RSA_E, RSA_N};

/// RSA public key. Modulus and exponent are big-endian magnitudes with
/// leading zero bytes removed (at least one byte is kept).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKey {
    algorithm: CoseAlgorithm,
    modulus: ByteBuffer,
    exponent: ByteBuffer,
}

fn strip_leading_zeros(bytes: &[u8]) -> ByteBuffer {
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let start = skip.min(bytes.len().saturating_sub(1));
    ByteBuffer::from(&bytes[start..])
}

impl RsaKey {
    pub(super) const LABELS: &'static [i64] = &[RSA_N, RSA_E];

    pub fn new(
        algorithm: CoseAlgorithm,
        modulus: &[u8],
        exponent: &[u8],
    ) -> Result<Self, WebauthnError> {
        if !algorithm.is_rsa() {
            return Err(WebauthnError::Parse(format!(
                "Algorithm {algorithm} is not supported for RSA keys"
            )));
        }
        if modulus.is_empty() || exponent.is_empty() {
            return Err(WebauthnError::Parse(
                "RSA modulus and exponent must not be empty".to_string(),
            ));
        }
        Ok(Self {
            algorithm,
            modulus: strip_leading_zeros(modulus),
            exponent: strip_leading_zeros(exponent),
        })
    }

    pub(super) fn from_cbor_map(algorithm: CoseAlgorithm, map: &CborMap) -> Result<Self, WebauthnError> {
        let n = required_bytes(map, RSA_N, "n")?;
        let e = required_bytes(map, RSA_E, "e")?;
        Self::new(algorithm, n.as_slice(), e.as_slice())
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn modulus(&self) -> &ByteBuffer {
        &self.modulus
    }

    pub fn exponent(&self) -> &ByteBuffer {
        &self.exponent
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<bool, WebauthnError> {
        crypto::verify_signature(
            self.algorithm,
            PublicKeyMaterial::RsaComponents {
                modulus: self.modulus.as_slice(),
                exponent: self.exponent.as_slice(),
            },
            message,
            signature,
        )
    }

    pub fn as_der(&self) -> Vec<u8> {
        let public_key = der::sequence(&[
            &der::unsigned_integer(self.modulus.as_slice()),
            &der::unsigned_integer(self.exponent.as_slice()),
        ]);
        der::sequence(&[
            &der::sequence(&[&der::oid(der::OID_RSA_ENCRYPTION), &der::null()]),
            &der::bit_string(&public_key),
        ])
    }

    pub(super) fn parameters(&self) -> Vec<(i64, CborValue)> {
        vec![
            (RSA_N, CborValue::Bytes(self.modulus.clone())),
            (RSA_E, CborValue::Bytes(self.exponent.clone())),
        ]
    }
}
