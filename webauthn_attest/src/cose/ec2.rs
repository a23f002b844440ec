use crate::buffer::ByteBuffer;
use crate::cbor::{CborMap, CborValue};
use crate::crypto::{self, PublicKeyMaterial};
use crate::errors::WebauthnError;

use super::algorithm::CoseAlgorithm;
use super::der;
use super::key::{required_bytes, required_int};
use super::labels::{EC2_CRV, EC2_X, EC2_Y};

/// NIST curves usable with EC2 keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    pub fn from_identifier(identifier: i64) -> Option<Self> {
        match identifier {
            1 => Some(EcCurve::P256),
            2 => Some(EcCurve::P384),
            3 => Some(EcCurve::P521),
            _ => None,
        }
    }

    pub fn identifier(self) -> i64 {
        match self {
            EcCurve::P256 => 1,
            EcCurve::P384 => 2,
            EcCurve::P521 => 3,
        }
    }

    /// Width in bytes of each affine coordinate.
    pub fn coordinate_len(self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    /// The only ECDSA algorithm accepted on this curve.
    pub fn algorithm(self) -> CoseAlgorithm {
        match self {
            EcCurve::P256 => CoseAlgorithm::ES256,
            EcCurve::P384 => CoseAlgorithm::ES384,
            EcCurve::P521 => CoseAlgorithm::ES512,
        }
    }

    pub(crate) fn oid(self) -> &'static [u8] {
        match self {
            EcCurve::P256 => der::OID_CURVE_P256,
            EcCurve::P384 => der::OID_CURVE_P384,
            EcCurve::P521 => der::OID_CURVE_P521,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ec2Key {
    algorithm: CoseAlgorithm,
    curve: EcCurve,
    x: ByteBuffer,
    y: ByteBuffer,
}

impl Ec2Key {
    pub(super) const LABELS: &'static [i64] = &[EC2_CRV, EC2_X, EC2_Y];

    pub fn new(
        algorithm: CoseAlgorithm,
        curve: EcCurve,
        x: impl Into<ByteBuffer>,
        y: impl Into<ByteBuffer>,
    ) -> Result<Self, WebauthnError> {
        let (x, y) = (x.into(), y.into());
        if curve.algorithm() != algorithm {
            return Err(WebauthnError::Parse(format!(
                "Algorithm {algorithm} is not supported on curve {curve:?}"
            )));
        }
        let width = curve.coordinate_len();
        if x.len() != width || y.len() != width {
            return Err(WebauthnError::Parse(format!(
                "EC2 coordinates for {curve:?} must be {width} bytes (x: {}, y: {})",
                x.len(),
                y.len()
            )));
        }
        Ok(Self {
            algorithm,
            curve,
            x,
            y,
        })
    }

    pub(super) fn from_cbor_map(algorithm: CoseAlgorithm, map: &CborMap) -> Result<Self, WebauthnError> {
        let crv = required_int(map, EC2_CRV, "crv")?;
        let curve = EcCurve::from_identifier(crv)
            .ok_or_else(|| WebauthnError::Parse(format!("Unsupported EC2 curve: {crv}")))?;
        let x = required_bytes(map, EC2_X, "x")?.clone();
        let y = required_bytes(map, EC2_Y, "y")?.clone();
        Self::new(algorithm, curve, x, y)
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub fn x(&self) -> &ByteBuffer {
        &self.x
    }

    pub fn y(&self) -> &ByteBuffer {
        &self.y
    }

    /// SEC1 uncompressed point `0x04 || x || y`.
    pub fn uncompressed_point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + self.x.len() + self.y.len());
        point.push(0x04);
        point.extend_from_slice(self.x.as_slice());
        point.extend_from_slice(self.y.as_slice());
        point
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<bool, WebauthnError> {
        let point = self.uncompressed_point();
        crypto::verify_signature(
            self.algorithm,
            PublicKeyMaterial::Ec {
                curve: self.curve,
                point: &point,
            },
            message,
            signature,
        )
    }

    pub fn as_der(&self) -> Vec<u8> {
        der::sequence(&[
            &der::sequence(&[&der::oid(der::OID_EC_PUBLIC_KEY), &der::oid(self.curve.oid())]),
            &der::bit_string(&self.uncompressed_point()),
        ])
    }

    pub(super) fn parameters(&self) -> Vec<(i64, CborValue)> {
        vec![
            (EC2_CRV, CborValue::integer(self.curve.identifier())),
            (EC2_X, CborValue::Bytes(self.x.clone())),
            (EC2_Y, CborValue::Bytes(self.y.clone())),
        ]
    }
}
