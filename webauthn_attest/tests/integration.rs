/// Integration tests for webauthn-attest
///
/// These tests drive complete registration and authentication ceremonies
/// through the public API with a software authenticator and an in-memory
/// credential store.
mod common;

mod integration {
    pub mod authentication_flows;
    pub mod registration_flows;
}
