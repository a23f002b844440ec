use thiserror::Error;

use crate::buffer::ByteBufferError;
use crate::cbor::CborError;
use crate::utils::UtilError;

/// Coarse classification of a [`WebauthnError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input structure.
    Parse,
    /// A mandated check failed.
    Verification,
    /// A legal but deliberately unimplemented path.
    Unsupported,
    /// Missing or invalid relying party setup.
    Configuration,
}

/// Errors that can occur while verifying WebAuthn ceremonies.
///
/// Every failure is terminal for the ceremony being verified. Use
/// [`WebauthnError::kind`] to map an error onto the coarse taxonomy, e.g. to
/// decide what to log versus what to surface to the end user.
#[derive(Debug, Error)]
pub enum WebauthnError {
    /// Malformed binary, CBOR, TPM, DER or JSON structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// A signature, hash, certificate or policy check failed
    #[error("Verification error: {0}")]
    Verification(String),

    /// A path that exists in the protocol but is not implemented (e.g. ECDAA)
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Relying party configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The attestation object names a format with no registered verifier
    #[error("Attestation format not supported: {0}")]
    FormatNotSupported(String),

    /// Error validating the client data JSON from the browser
    #[error("Invalid client data: {0}")]
    ClientData(String),

    /// Error with the cryptographic challenge
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// Error validating the authenticator data against the ceremony
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// Unknown credential or credential/user mismatch
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Buffer error: {0}")]
    Buffer(#[from] ByteBufferError),

    #[error("CBOR error: {0}")]
    Cbor(#[from] CborError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    #[error("Json conversion(Serde) error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl WebauthnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebauthnError::Parse(_)
            | WebauthnError::Buffer(_)
            | WebauthnError::Cbor(_)
            | WebauthnError::Utils(_)
            | WebauthnError::SerdeJson(_) => ErrorKind::Parse,
            WebauthnError::Verification(_)
            | WebauthnError::ClientData(_)
            | WebauthnError::Challenge(_)
            | WebauthnError::AuthenticatorData(_)
            | WebauthnError::Credential(_) => ErrorKind::Verification,
            WebauthnError::Unsupported(_) | WebauthnError::FormatNotSupported(_) => {
                ErrorKind::Unsupported
            }
            WebauthnError::Config(_) => ErrorKind::Configuration,
        }
    }
}
