//! A software authenticator producing `none` and `packed` self attestation
//! responses and assertions with a P-256 key.

use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use sha2::{Digest, Sha256};

use webauthn_attest::cbor::{self, CborMap, CborValue};
use webauthn_attest::cose::{CoseAlgorithm, CoseKey, Ec2Key, EcCurve};
use webauthn_attest::{
    AuthenticatorAssertion, AuthenticatorAttestation, attestation::flags, base64url_encode,
};

use super::{ORIGIN, RP_ID};

pub const AAGUID: [u8; 16] = [
    0xad, 0xce, 0x00, 0x02, 0x35, 0xbc, 0xc6, 0x0a, 0x64, 0x8b, 0x0b, 0x25, 0xf1, 0xf0, 0x55, 0x03,
];

pub struct SoftAuthenticator {
    pub credential_id: Vec<u8>,
    pub user_handle: Vec<u8>,
    key: EcdsaKeyPair,
    rng: SystemRandom,
    sign_count: u32,
    flags: u8,
}

impl SoftAuthenticator {
    pub fn new(credential_id: &[u8], user_handle: &[u8]) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
        Self {
            credential_id: credential_id.to_vec(),
            user_handle: user_handle.to_vec(),
            key,
            rng,
            sign_count: 0,
            flags: flags::UP | flags::UV,
        }
    }

    /// Counter reported by the next response; 0 disables counting.
    pub fn with_sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    pub fn set_sign_count(&mut self, sign_count: u32) {
        self.sign_count = sign_count;
    }

    pub fn cose_key(&self) -> CoseKey {
        let point = &self.key.public_key().as_ref()[1..];
        let (x, y) = point.split_at(32);
        CoseKey::Ec2(Ec2Key::new(CoseAlgorithm::ES256, EcCurve::P256, x.to_vec(), y.to_vec()).unwrap())
    }

    fn auth_data(&self, attested: bool) -> Vec<u8> {
        let mut out = Sha256::digest(RP_ID.as_bytes()).to_vec();
        out.push(if attested { self.flags | flags::AT } else { self.flags });
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if attested {
            out.extend_from_slice(&AAGUID);
            out.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            out.extend_from_slice(&self.credential_id);
            out.extend_from_slice(&self.cose_key().to_cbor());
        }
        out
    }

    fn sign(&self, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut signed = auth_data.to_vec();
        signed.extend_from_slice(&Sha256::digest(client_data_json));
        self.key.sign(&self.rng, &signed).unwrap().as_ref().to_vec()
    }

    /// `navigator.credentials.create()` output with the given format.
    pub fn register(&self, fmt: &str, challenge: &[u8]) -> AuthenticatorAttestation {
        let client_data_json = client_data_json("webauthn.create", challenge);
        let auth_data = self.auth_data(true);
        let statement = match fmt {
            "packed" => CborMap::new()
                .with("alg", CborValue::integer(CoseAlgorithm::ES256.identifier()))
                .with("sig", CborValue::bytes(self.sign(&auth_data, &client_data_json))),
            _ => CborMap::new(),
        };
        let object = CborMap::new()
            .with("fmt", CborValue::text(fmt))
            .with("attStmt", CborValue::from(statement))
            .with("authData", CborValue::bytes(auth_data));
        AuthenticatorAttestation {
            client_data_json,
            attestation_object: cbor::encode(&CborValue::from(object)),
        }
    }

    /// `navigator.credentials.get()` output.
    pub fn assert(&self, challenge: &[u8]) -> AuthenticatorAssertion {
        let client_data_json = client_data_json("webauthn.get", challenge);
        let authenticator_data = self.auth_data(false);
        AuthenticatorAssertion {
            credential_id: self.credential_id.clone(),
            signature: self.sign(&authenticator_data, &client_data_json),
            client_data_json,
            authenticator_data,
            user_handle: Some(self.user_handle.clone()),
        }
    }
}

pub fn client_data_json(type_: &str, challenge: &[u8]) -> Vec<u8> {
    serde_json::json!({
        "type": type_,
        "challenge": base64url_encode(challenge),
        "origin": ORIGIN,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}
