use std::sync::Arc;

use webauthn_attest::{
    AssertionContext, AssertionVerifier, ClonePolicy, CounterStatus, ErrorKind,
    RegistrationContext, RegistrationVerifier,
};

use crate::common::{MemoryStore, SoftAuthenticator, init_test_tracing, rp_config};

/// Registers `authenticator` for its user and returns the store holding it.
fn registered(authenticator: &SoftAuthenticator) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    RegistrationVerifier::new(rp_config())
        .with_credential_store(store.clone())
        .verify(
            &RegistrationContext::new(b"reg".to_vec(), authenticator.user_handle.clone()),
            &authenticator.register("packed", b"reg"),
        )
        .expect("registration should succeed");
    store
}

#[test]
fn test_register_then_authenticate() {
    init_test_tracing();
    let mut authenticator = SoftAuthenticator::new(b"cred-1", b"alice").with_sign_count(1);
    let store = registered(&authenticator);
    let verifier = AssertionVerifier::new(rp_config(), store.clone());
    let context = AssertionContext::new(b"login-1".to_vec())
        .with_allow_credentials(vec![b"cred-1".to_vec()]);

    authenticator.set_sign_count(2);
    let result = verifier
        .verify(&context, &authenticator.assert(b"login-1"))
        .expect("assertion should verify");
    assert_eq!(result.user_handle, b"alice");
    assert_eq!(result.counter_status, CounterStatus::Incremented);
    assert_eq!(store.sign_count(b"cred-1"), Some(2));
}

#[test]
fn test_replayed_counter_is_rejected() {
    init_test_tracing();
    let mut authenticator = SoftAuthenticator::new(b"cred-2", b"bob").with_sign_count(10);
    let store = registered(&authenticator);
    let context = AssertionContext::new(b"login".to_vec());

    authenticator.set_sign_count(10);
    let response = authenticator.assert(b"login");

    let err = AssertionVerifier::new(rp_config(), store.clone())
        .verify(&context, &response)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);

    let result = AssertionVerifier::new(rp_config(), store.clone())
        .with_clone_policy(ClonePolicy::Flag)
        .verify(&context, &response)
        .unwrap();
    assert_eq!(result.counter_status, CounterStatus::PossibleClone);
    assert_eq!(store.sign_count(b"cred-2"), Some(10));
}

#[test]
fn test_authenticator_without_counter() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred-3", b"carol");
    let store = registered(&authenticator);
    let verifier = AssertionVerifier::new(rp_config(), store);

    for challenge in [b"first".as_slice(), b"second".as_slice()] {
        let result = verifier
            .verify(
                &AssertionContext::new(challenge.to_vec()),
                &authenticator.assert(challenge),
            )
            .unwrap();
        assert_eq!(result.counter_status, CounterStatus::Unsupported);
    }
}

#[test]
fn test_discoverable_login_needs_user_handle() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred-4", b"dave");
    let store = registered(&authenticator);
    let verifier = AssertionVerifier::new(rp_config(), store);

    let mut response = authenticator.assert(b"login");
    response.user_handle = None;
    let err = verifier
        .verify(&AssertionContext::new(b"login".to_vec()), &response)
        .unwrap_err();
    assert!(err.to_string().contains("user handle"));
}

#[test]
fn test_assertion_from_other_key_is_rejected() {
    init_test_tracing();
    let authenticator = SoftAuthenticator::new(b"cred-5", b"erin");
    let store = registered(&authenticator);
    let impostor = SoftAuthenticator::new(b"cred-5", b"erin");

    let err = AssertionVerifier::new(rp_config(), store)
        .verify(
            &AssertionContext::new(b"login".to_vec()),
            &impostor.assert(b"login"),
        )
        .unwrap_err();
    assert!(err.to_string().contains("signature"));
}
