//! Test utilities for building authenticator output
//!
//! Keys are generated fresh with `ring`; authenticator data, attestation
//! objects and TPM structures are assembled byte by byte so tests can tamper
//! with individual fields.

pub(crate) mod der_builder;

use std::collections::HashMap;
use std::sync::Mutex;

use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair,
    KeyPair,
};

use crate::attestation::flags;
use crate::cbor::{self, CborMap, CborValue};
use crate::ceremony::{CredentialStore, RegistrationResult, StoredCredential};
use crate::cose::{CoseAlgorithm, CoseKey, Ec2Key, EcCurve, HashAlgorithm, OkpCurve, OkpKey};
use crate::crypto::PublicKeyMaterial;
use crate::errors::WebauthnError;
use crate::tpm::{
    TPM_ALG_ECC, TPM_ALG_NULL, TPM_ALG_RSA, TPM_ALG_SHA256, TPM_GENERATED_VALUE,
    TPM_ST_ATTEST_CERTIFY,
};
use crate::utils::{base64url_encode, sha256};

enum KeyKind {
    Ecdsa(EcdsaKeyPair, EcCurve),
    Ed25519(Ed25519KeyPair),
}

/// A freshly generated signing key.
pub(crate) struct TestKeyPair {
    kind: KeyKind,
    pkcs8: Vec<u8>,
}

impl TestKeyPair {
    fn ecdsa(
        alg: &'static ring::signature::EcdsaSigningAlgorithm,
        curve: EcCurve,
    ) -> TestKeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng).unwrap();
        let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng).unwrap();
        TestKeyPair {
            kind: KeyKind::Ecdsa(pair, curve),
            pkcs8: pkcs8.as_ref().to_vec(),
        }
    }

    pub(crate) fn p256() -> TestKeyPair {
        Self::ecdsa(&ECDSA_P256_SHA256_ASN1_SIGNING, EcCurve::P256)
    }

    pub(crate) fn p384() -> TestKeyPair {
        Self::ecdsa(&ECDSA_P384_SHA384_ASN1_SIGNING, EcCurve::P384)
    }

    pub(crate) fn ed25519() -> TestKeyPair {
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&SystemRandom::new()).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        TestKeyPair {
            kind: KeyKind::Ed25519(pair),
            pkcs8: pkcs8.as_ref().to_vec(),
        }
    }

    /// PKCS#8 private key document.
    pub(crate) fn pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }

    /// ECDSA signatures are ASN.1 DER encoded, as WebAuthn carries them.
    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.kind {
            KeyKind::Ecdsa(pair, _) => pair
                .sign(&SystemRandom::new(), message)
                .unwrap()
                .as_ref()
                .to_vec(),
            KeyKind::Ed25519(pair) => pair.sign(message).as_ref().to_vec(),
        }
    }

    pub(crate) fn material(&self) -> PublicKeyMaterial<'_> {
        match &self.kind {
            KeyKind::Ecdsa(pair, curve) => PublicKeyMaterial::Ec {
                curve: *curve,
                point: pair.public_key().as_ref(),
            },
            KeyKind::Ed25519(pair) => PublicKeyMaterial::Ed25519 {
                key: pair.public_key().as_ref(),
            },
        }
    }

    pub(crate) fn algorithm(&self) -> CoseAlgorithm {
        self.cose_key().algorithm()
    }

    pub(crate) fn cose_key(&self) -> CoseKey {
        match &self.kind {
            KeyKind::Ecdsa(pair, curve) => {
                let point = &pair.public_key().as_ref()[1..];
                let (x, y) = point.split_at(point.len() / 2);
                CoseKey::Ec2(Ec2Key::new(curve.algorithm(), *curve, x.to_vec(), y.to_vec()).unwrap())
            }
            KeyKind::Ed25519(pair) => CoseKey::Okp(
                OkpKey::new(
                    CoseAlgorithm::EdDSA,
                    OkpCurve::Ed25519,
                    pair.public_key().as_ref().to_vec(),
                )
                .unwrap(),
            ),
        }
    }

    pub(crate) fn spki_der(&self) -> Vec<u8> {
        self.cose_key().as_der()
    }
}

/// Builds raw authenticator data. AT and ED are derived from the content
/// unless `force_flags` pins the flags byte.
pub(crate) struct AuthDataBuilder {
    rp_id: String,
    flags: u8,
    forced_flags: Option<u8>,
    sign_count: u32,
    aaguid: [u8; 16],
    credential: Option<(Vec<u8>, CoseKey)>,
    extensions: Option<CborMap>,
}

impl AuthDataBuilder {
    pub(crate) fn new(rp_id: &str) -> Self {
        Self {
            rp_id: rp_id.to_string(),
            flags: flags::UP,
            forced_flags: None,
            sign_count: 0,
            aaguid: [0; 16],
            credential: None,
            extensions: None,
        }
    }

    pub(crate) fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn force_flags(mut self, flags: u8) -> Self {
        self.forced_flags = Some(flags);
        self
    }

    pub(crate) fn sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    pub(crate) fn aaguid(mut self, aaguid: [u8; 16]) -> Self {
        self.aaguid = aaguid;
        self
    }

    pub(crate) fn credential(mut self, credential_id: Vec<u8>, key: &CoseKey) -> Self {
        self.credential = Some((credential_id, key.clone()));
        self
    }

    pub(crate) fn extensions(mut self, extensions: CborMap) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut flags = self.flags;
        if self.credential.is_some() {
            flags |= flags::AT;
        }
        if self.extensions.is_some() {
            flags |= flags::ED;
        }
        let flags = self.forced_flags.unwrap_or(flags);

        let mut out = sha256(self.rp_id.as_bytes()).to_vec();
        out.push(flags);
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some((credential_id, key)) = &self.credential {
            out.extend_from_slice(&self.aaguid);
            out.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
            out.extend_from_slice(credential_id);
            out.extend_from_slice(&key.to_cbor());
        }
        if let Some(extensions) = self.extensions {
            out.extend_from_slice(&cbor::encode(&CborValue::from(extensions)));
        }
        out
    }
}

/// CBOR attestation object `{fmt, attStmt, authData}`.
pub(crate) fn attestation_object(fmt: &str, statement: CborMap, auth_data: &[u8]) -> Vec<u8> {
    let object = CborMap::new()
        .with("fmt", CborValue::text(fmt))
        .with("attStmt", CborValue::from(statement))
        .with("authData", CborValue::bytes(auth_data.to_vec()));
    cbor::encode(&CborValue::from(object))
}

fn push_sized(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

fn pub_area_header(object_type: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&object_type.to_be_bytes());
    out.extend_from_slice(&TPM_ALG_SHA256.to_be_bytes());
    // fixedTPM | fixedParent | sensitiveDataOrigin | userWithAuth | noDA | sign
    out.extend_from_slice(&0x0006_0472u32.to_be_bytes());
    push_sized(&mut out, &[]); // authPolicy
    out.extend_from_slice(&TPM_ALG_NULL.to_be_bytes()); // symmetric
    out.extend_from_slice(&TPM_ALG_NULL.to_be_bytes()); // scheme
    out
}

/// TPMT_PUBLIC for an RSA signing key. An `exponent` of 0 means 65537.
pub(crate) fn tpm_rsa_pub_area(modulus: &[u8], exponent: u32) -> Vec<u8> {
    let mut out = pub_area_header(TPM_ALG_RSA);
    out.extend_from_slice(&((modulus.len() * 8) as u16).to_be_bytes());
    out.extend_from_slice(&exponent.to_be_bytes());
    push_sized(&mut out, modulus);
    out
}

/// TPMT_PUBLIC for an ECC signing key.
pub(crate) fn tpm_ecc_pub_area(curve_id: u16, x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut out = pub_area_header(TPM_ALG_ECC);
    out.extend_from_slice(&curve_id.to_be_bytes());
    out.extend_from_slice(&TPM_ALG_NULL.to_be_bytes()); // kdf
    push_sized(&mut out, x);
    push_sized(&mut out, y);
    out
}

/// TPM name of a public area: nameAlg || SHA-256(pubArea).
pub(crate) fn tpm_name(pub_area: &[u8]) -> Vec<u8> {
    let mut name = TPM_ALG_SHA256.to_be_bytes().to_vec();
    name.extend_from_slice(&HashAlgorithm::Sha256.digest(pub_area));
    name
}

/// TPMS_ATTEST of type TPM_ST_ATTEST_CERTIFY.
pub(crate) fn tpm_cert_info(extra_data: &[u8], attested_name: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&TPM_GENERATED_VALUE.to_be_bytes());
    out.extend_from_slice(&TPM_ST_ATTEST_CERTIFY.to_be_bytes());
    push_sized(&mut out, &[0x00, 0x0b, 0x01, 0x02]); // qualifiedSigner
    push_sized(&mut out, extra_data);
    out.extend_from_slice(&[0x00; 17]); // clockInfo
    out.extend_from_slice(&[0x00; 8]); // firmwareVersion
    push_sized(&mut out, attested_name);
    push_sized(&mut out, &[0x00, 0x0b, 0x03, 0x04]); // qualifiedName
    out
}

/// Client data JSON as a browser would serialize it.
pub(crate) fn client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": type_,
        "challenge": base64url_encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

#[derive(Default)]
pub(crate) struct MemoryCredentialStore {
    credentials: Mutex<HashMap<Vec<u8>, StoredCredential>>,
}

impl MemoryCredentialStore {
    pub(crate) fn insert(&self, credential: StoredCredential) {
        self.credentials
            .lock()
            .unwrap()
            .insert(credential.credential_id.clone(), credential);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_credential(&self, credential_id: &[u8]) -> Result<Option<StoredCredential>, WebauthnError> {
        Ok(self.credentials.lock().unwrap().get(credential_id).cloned())
    }

    fn register_credential(
        &self,
        user_handle: &[u8],
        result: &RegistrationResult,
    ) -> Result<(), WebauthnError> {
        self.insert(StoredCredential {
            credential_id: result.credential_id.to_vec(),
            user_handle: user_handle.to_vec(),
            public_key: result.credential_public_key.clone(),
            sign_count: result.sign_count,
        });
        Ok(())
    }

    fn update_sign_count(&self, credential_id: &[u8], sign_count: u32) -> Result<(), WebauthnError> {
        match self.credentials.lock().unwrap().get_mut(credential_id) {
            Some(credential) => {
                credential.sign_count = sign_count;
                Ok(())
            }
            None => Err(WebauthnError::Credential("Unknown credential".to_string())),
        }
    }
}
