//! Signature verification backends keyed by COSE algorithm.
//!
//! `ring` covers ECDSA P-256/P-384, Ed25519 and RSA. P-521 goes through the
//! RustCrypto `p521` crate.

use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey, VerificationAlgorithm};

use crate::cose::{CoseAlgorithm, EcCurve};
use crate::errors::WebauthnError;

/// Public key material in the encodings the backends consume.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PublicKeyMaterial<'a> {
    /// SEC1 uncompressed point (`0x04 || x || y`).
    Ec { curve: EcCurve, point: &'a [u8] },
    /// Big-endian modulus and exponent.
    RsaComponents { modulus: &'a [u8], exponent: &'a [u8] },
    /// PKCS#1 RSAPublicKey DER, as found inside a certificate SPKI.
    RsaPkcs1 { der: &'a [u8] },
    Ed25519 { key: &'a [u8] },
}

impl PublicKeyMaterial<'_> {
    fn describe(&self) -> String {
        match self {
            PublicKeyMaterial::Ec { curve, .. } => format!("EC {curve:?}"),
            PublicKeyMaterial::RsaComponents { .. } | PublicKeyMaterial::RsaPkcs1 { .. } => {
                "RSA".to_string()
            }
            PublicKeyMaterial::Ed25519 { .. } => "Ed25519".to_string(),
        }
    }
}

/// Verifies `signature` over `message`.
///
/// Returns `Ok(false)` for a well-formed but wrong signature and an error when
/// the algorithm cannot be used with the given key.
pub(crate) fn verify_signature(
    algorithm: CoseAlgorithm,
    key: PublicKeyMaterial<'_>,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, WebauthnError> {
    match (algorithm, key) {
        (CoseAlgorithm::ES256, PublicKeyMaterial::Ec { curve: EcCurve::P256, point }) => {
            Ok(verify_ring(&signature::ECDSA_P256_SHA256_ASN1, point, message, signature))
        }
        (CoseAlgorithm::ES384, PublicKeyMaterial::Ec { curve: EcCurve::P384, point }) => {
            Ok(verify_ring(&signature::ECDSA_P384_SHA384_ASN1, point, message, signature))
        }
        (CoseAlgorithm::ES512, PublicKeyMaterial::Ec { curve: EcCurve::P521, point }) => {
            verify_p521(point, message, signature)
        }
        (CoseAlgorithm::EdDSA, PublicKeyMaterial::Ed25519 { key }) => {
            Ok(verify_ring(&signature::ED25519, key, message, signature))
        }
        (alg, PublicKeyMaterial::RsaComponents { modulus, exponent }) if alg.is_rsa() => {
            let params = rsa_parameters(alg)?;
            let components = RsaPublicKeyComponents {
                n: modulus,
                e: exponent,
            };
            Ok(components.verify(params, message, signature).is_ok())
        }
        (alg, PublicKeyMaterial::RsaPkcs1 { der }) if alg.is_rsa() => {
            let params = rsa_parameters(alg)?;
            Ok(UnparsedPublicKey::new(params, der)
                .verify(message, signature)
                .is_ok())
        }
        (alg, key) => Err(WebauthnError::Verification(format!(
            "Algorithm {alg} cannot be used with a {} key",
            key.describe()
        ))),
    }
}

fn verify_ring(
    algorithm: &'static dyn VerificationAlgorithm,
    key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> bool {
    UnparsedPublicKey::new(algorithm, key)
        .verify(message, signature)
        .is_ok()
}

fn rsa_parameters(
    algorithm: CoseAlgorithm,
) -> Result<&'static signature::RsaParameters, WebauthnError> {
    match algorithm {
        CoseAlgorithm::RS256 => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
        CoseAlgorithm::RS384 => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
        CoseAlgorithm::RS512 => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
        CoseAlgorithm::PS256 => Ok(&signature::RSA_PSS_2048_8192_SHA256),
        CoseAlgorithm::PS384 => Ok(&signature::RSA_PSS_2048_8192_SHA384),
        CoseAlgorithm::PS512 => Ok(&signature::RSA_PSS_2048_8192_SHA512),
        CoseAlgorithm::RS1 => Ok(&signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY),
        other => Err(WebauthnError::Verification(format!(
            "{other} is not an RSA algorithm"
        ))),
    }
}

fn verify_p521(point: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, WebauthnError> {
    use p521::ecdsa::{Signature, VerifyingKey, signature::Verifier};

    let key = VerifyingKey::from_sec1_bytes(point)
        .map_err(|_| WebauthnError::Verification("Invalid P-521 public key".to_string()))?;
    let Ok(signature) = Signature::from_der(signature) else {
        return Ok(false);
    };
    Ok(key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestKeyPair;

    #[test]
    fn test_es256_and_es384() {
        for (alg, key) in [
            (CoseAlgorithm::ES256, TestKeyPair::p256()),
            (CoseAlgorithm::ES384, TestKeyPair::p384()),
        ] {
            let sig = key.sign(b"message");
            let material = key.material();
            assert!(verify_signature(alg, material, b"message", &sig).unwrap());
            assert!(!verify_signature(alg, material, b"massage", &sig).unwrap());
        }
    }

    #[test]
    fn test_ed25519() {
        let key = TestKeyPair::ed25519();
        let sig = key.sign(b"message");
        assert!(verify_signature(CoseAlgorithm::EdDSA, key.material(), b"message", &sig).unwrap());
        assert!(!verify_signature(CoseAlgorithm::EdDSA, key.material(), b"other", &sig).unwrap());
    }

    #[test]
    fn test_mismatched_algorithm_and_key() {
        let key = TestKeyPair::p256();
        let sig = key.sign(b"message");
        let err = verify_signature(CoseAlgorithm::ES384, key.material(), b"message", &sig)
            .unwrap_err();
        assert!(err.to_string().contains("cannot be used"));
        assert!(verify_signature(CoseAlgorithm::RS256, key.material(), b"message", &sig).is_err());
    }

    #[test]
    fn test_garbage_signature_is_false_not_error() {
        let key = TestKeyPair::p256();
        assert!(!verify_signature(CoseAlgorithm::ES256, key.material(), b"m", &[1, 2, 3]).unwrap());
    }

    #[test]
    fn test_invalid_p521_point_is_error() {
        let material = PublicKeyMaterial::Ec {
            curve: EcCurve::P521,
            point: &[0x04; 133],
        };
        assert!(verify_signature(CoseAlgorithm::ES512, material, b"m", &[0x30, 0x00]).is_err());
    }
}
