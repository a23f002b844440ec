//! webauthn-attest - Server-side WebAuthn attestation and assertion verification
//!
//! This crate parses the binary output of FIDO2 authenticators (CBOR
//! attestation objects, COSE keys, TPM structures, X.509 extensions) and
//! verifies it for the `none`, `fido-u2f`, `packed`, `tpm`, `android-key`,
//! `android-safetynet` and `apple` attestation formats. The ceremony layer
//! checks client data, authenticator data flags and signature counters on
//! top of that and hands credentials to a caller-supplied store.

pub mod attestation;
pub mod buffer;
pub mod cbor;
pub mod ceremony;
pub mod clock;
pub mod config;
pub mod cose;
mod crypto;
mod errors;
pub mod pki;
pub mod tpm;
mod utils;

#[cfg(test)]
mod test_utils;

pub use attestation::{
    Aaguid, AttestationFormat, AttestationObject, AttestationType, AttestationVerifiers,
    AuthenticatorData, TrustPath, VerificationResult,
};
pub use ceremony::{
    AssertionContext, AssertionResult, AssertionVerifier, AuthenticatorAssertion,
    AuthenticatorAttestation, ClonePolicy, CounterStatus, CredentialStore, RegistrationContext,
    RegistrationResult, RegistrationVerifier, StoredCredential,
};
pub use config::{RelyingPartyConfig, UserVerificationRequirement};
pub use cose::{CoseAlgorithm, CoseKey};
pub use errors::{ErrorKind, WebauthnError};
pub use utils::{UtilError, base64url_decode, base64url_encode};
