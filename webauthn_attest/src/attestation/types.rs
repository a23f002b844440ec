use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::errors::WebauthnError;
use crate::pki::Certificate;

/// Attestation statement formats from the WebAuthn registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationFormat {
    None,
    FidoU2f,
    Packed,
    Tpm,
    AndroidKey,
    AndroidSafetyNet,
    Apple,
}

impl AttestationFormat {
    pub const ALL: [AttestationFormat; 7] = [
        AttestationFormat::None,
        AttestationFormat::FidoU2f,
        AttestationFormat::Packed,
        AttestationFormat::Tpm,
        AttestationFormat::AndroidKey,
        AttestationFormat::AndroidSafetyNet,
        AttestationFormat::Apple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttestationFormat::None => "none",
            AttestationFormat::FidoU2f => "fido-u2f",
            AttestationFormat::Packed => "packed",
            AttestationFormat::Tpm => "tpm",
            AttestationFormat::AndroidKey => "android-key",
            AttestationFormat::AndroidSafetyNet => "android-safetynet",
            AttestationFormat::Apple => "apple",
        }
    }
}

impl FromStr for AttestationFormat {
    type Err = WebauthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttestationFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| WebauthnError::FormatNotSupported(s.to_string()))
    }
}

impl fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationType {
    None,
    Basic,
    SelfAttestation,
    AttCa,
    AnonCa,
    Ecdaa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPath {
    Empty,
    /// Leaf first.
    Certificates(Vec<Certificate>),
}

impl TrustPath {
    pub fn certificates(&self) -> &[Certificate] {
        match self {
            TrustPath::Empty => &[],
            TrustPath::Certificates(certs) => certs,
        }
    }
}

/// Outcome of a successful attestation statement verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub attestation_type: AttestationType,
    pub trust_path: TrustPath,
}

impl VerificationResult {
    pub fn new(attestation_type: AttestationType, trust_path: TrustPath) -> Self {
        Self {
            attestation_type,
            trust_path,
        }
    }
}

/// Authenticator model identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Aaguid([u8; 16]);

impl Aaguid {
    pub const ZERO: Aaguid = Aaguid([0; 16]);

    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }

    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl fmt::Debug for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aaguid({self})")
    }
}
