use crate::buffer::ByteBuffer;
use crate::cbor::{CborMap, CborValue};
use crate::crypto::{self, PublicKeyMaterial};
use crate::errors::WebauthnError;

use super::algorithm::CoseAlgorithm;
use super::der;
use super::key::{required_bytes, required_int};
use super::labels::{OKP_CRV, OKP_X};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OkpCurve {
    Ed25519,
}

impl OkpCurve {
    pub fn from_identifier(identifier: i64) -> Option<Self> {
        match identifier {
            6 => Some(OkpCurve::Ed25519),
            _ => None,
        }
    }

    pub fn identifier(self) -> i64 {
        match self {
            OkpCurve::Ed25519 => 6,
        }
    }

    pub fn key_len(self) -> usize {
        match self {
            OkpCurve::Ed25519 => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpKey {
    algorithm: CoseAlgorithm,
    curve: OkpCurve,
    x: ByteBuffer,
}

impl OkpKey {
    pub(super) const LABELS: &'static [i64] = &[OKP_CRV, OKP_X];

    pub fn new(
        algorithm: CoseAlgorithm,
        curve: OkpCurve,
        x: impl Into<ByteBuffer>,
    ) -> Result<Self, WebauthnError> {
        let x = x.into();
        if algorithm != CoseAlgorithm::EdDSA {
            return Err(WebauthnError::Parse(format!(
                "Algorithm {algorithm} is not supported for OKP keys"
            )));
        }
        if x.len() != curve.key_len() {
            return Err(WebauthnError::Parse(format!(
                "OKP public key for {curve:?} must be {} bytes, got {}",
                curve.key_len(),
                x.len()
            )));
        }
        Ok(Self {
            algorithm,
            curve,
            x,
        })
    }

    pub(super) fn from_cbor_map(algorithm: CoseAlgorithm, map: &CborMap) -> Result<Self, WebauthnError> {
        let crv = required_int(map, OKP_CRV, "crv")?;
        let curve = OkpCurve::from_identifier(crv)
            .ok_or_else(|| WebauthnError::Parse(format!("Unsupported OKP curve: {crv}")))?;
        let x = required_bytes(map, OKP_X, "x")?.clone();
        Self::new(algorithm, curve, x)
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> OkpCurve {
        self.curve
    }

    pub fn x(&self) -> &ByteBuffer {
        &self.x
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<bool, WebauthnError> {
        crypto::verify_signature(
            self.algorithm,
            PublicKeyMaterial::Ed25519 {
                key: self.x.as_slice(),
            },
            message,
            signature,
        )
    }

    pub fn as_der(&self) -> Vec<u8> {
        der::sequence(&[
            &der::sequence(&[&der::oid(der::OID_ED25519)]),
            &der::bit_string(self.x.as_slice()),
        ])
    }

    pub(super) fn parameters(&self) -> Vec<(i64, CborValue)> {
        vec![
            (OKP_CRV, CborValue::integer(self.curve.identifier())),
            (OKP_X, CborValue::Bytes(self.x.clone())),
        ]
    }
}
