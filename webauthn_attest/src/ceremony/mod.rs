//! Registration and authentication ceremonies over the attestation core.

mod assertion;
mod client_data;
mod collaborators;
mod registration;

pub use assertion::{
    AssertionContext, AssertionResult, AssertionVerifier, AuthenticatorAssertion, ClonePolicy,
    CounterStatus,
};
pub use client_data::{CollectedClientData, TokenBinding};
pub use collaborators::{
    AcceptAll, AuthenticatorMetadata, CertificateStatusResolver, CredentialStore,
    MetadataResolver, RequireKnownAuthenticator, StoredCredential, TrustDecisionManager,
};
pub use registration::{
    AuthenticatorAttestation, RegistrationContext, RegistrationResult, RegistrationVerifier,
};
