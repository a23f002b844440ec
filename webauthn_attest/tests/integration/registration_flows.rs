use std::sync::Arc;

use webauthn_attest::{
    Aaguid, AttestationFormat, AttestationType, AttestationVerifiers, CoseAlgorithm, ErrorKind,
    RegistrationContext, RegistrationVerifier, TrustPath,
};

use crate::common::{MemoryStore, SoftAuthenticator, authenticator::AAGUID, init_test_tracing, rp_config};

const CHALLENGE: &[u8] = b"registration challenge";

fn context() -> RegistrationContext {
    RegistrationContext::new(CHALLENGE, b"alice".to_vec())
        .with_allowed_algorithms([CoseAlgorithm::ES256, CoseAlgorithm::RS256])
}

#[test]
fn test_none_attestation_registration() {
    init_test_tracing();
    let store = Arc::new(MemoryStore::default());
    let authenticator = SoftAuthenticator::new(b"cred-none", b"alice");

    let result = RegistrationVerifier::new(rp_config())
        .with_credential_store(store.clone())
        .verify(&context(), &authenticator.register("none", CHALLENGE))
        .expect("none attestation should verify");

    assert_eq!(result.format, AttestationFormat::None);
    assert_eq!(result.verification.attestation_type, AttestationType::None);
    assert_eq!(result.verification.trust_path, TrustPath::Empty);
    assert_eq!(result.aaguid, Aaguid::new(AAGUID));
    assert_eq!(result.credential_public_key, authenticator.cose_key());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_packed_self_attestation_registration() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred-packed", b"alice");

    let result = RegistrationVerifier::new(rp_config())
        .verify(&context(), &authenticator.register("packed", CHALLENGE))
        .expect("packed self attestation should verify");

    assert_eq!(result.format, AttestationFormat::Packed);
    assert_eq!(
        result.verification.attestation_type,
        AttestationType::SelfAttestation
    );
    assert_eq!(result.credential_id.as_slice(), b"cred-packed");
}

#[test]
fn test_registration_with_wrong_challenge() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred", b"alice");
    let err = RegistrationVerifier::new(rp_config())
        .verify(&context(), &authenticator.register("packed", b"stale challenge"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);
}

#[test]
fn test_disabled_format_is_rejected() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred", b"alice");
    let verifier = RegistrationVerifier::new(rp_config()).with_attestation_verifiers(
        AttestationVerifiers::new().with_formats([AttestationFormat::Packed]),
    );

    let err = verifier
        .verify(&context(), &authenticator.register("none", CHALLENGE))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    verifier
        .verify(&context(), &authenticator.register("packed", CHALLENGE))
        .unwrap();
}

#[test]
fn test_duplicate_registration_is_rejected() {
    init_test_tracing();
    let store = Arc::new(MemoryStore::default());
    let verifier = RegistrationVerifier::new(rp_config()).with_credential_store(store.clone());
    let authenticator = SoftAuthenticator::new(b"cred-dup", b"alice");

    verifier
        .verify(&context(), &authenticator.register("none", CHALLENGE))
        .unwrap();
    let err = verifier
        .verify(&context(), &authenticator.register("none", CHALLENGE))
        .unwrap_err();
    assert!(err.to_string().contains("already registered"));
    assert_eq!(store.len(), 1);
}
