//! Attestation objects, statements and the per-format verifiers.

mod android_key;
mod android_safetynet;
mod apple;
mod authenticator_data;
mod core;
mod none;
mod object;
mod packed;
mod statement;
mod tpm;
mod types;
mod u2f;
mod utils;

pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, flags};
pub use core::AttestationVerifiers;
pub use object::AttestationObject;
pub use statement::{
    AndroidKeyStatement, AndroidSafetyNetStatement, AppleStatement, AttestationPath,
    AttestationStatement, FidoU2fStatement, PackedStatement, TpmStatement,
};
pub use types::{Aaguid, AttestationFormat, AttestationType, TrustPath, VerificationResult};
