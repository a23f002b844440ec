//! Interfaces to the services a ceremony depends on but does not implement:
//! credential persistence, certificate revocation, authenticator metadata and
//! the final trust policy.

use crate::attestation::{Aaguid, AttestationType};
use crate::cose::CoseKey;
use crate::errors::WebauthnError;
use crate::pki::{Certificate, ChainValidator, TrustAnchorValidator};

use super::registration::RegistrationResult;

/// A registered credential as persisted by the relying party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,
    pub user_handle: Vec<u8>,
    pub public_key: CoseKey,
    pub sign_count: u32,
}

pub trait CredentialStore: Send + Sync {
    fn find_credential(&self, credential_id: &[u8]) -> Result<Option<StoredCredential>, WebauthnError>;

    fn register_credential(
        &self,
        user_handle: &[u8],
        result: &RegistrationResult,
    ) -> Result<(), WebauthnError>;

    fn update_sign_count(&self, credential_id: &[u8], sign_count: u32) -> Result<(), WebauthnError>;
}

/// Revocation status lookup (CRL, OCSP) for trust path certificates.
pub trait CertificateStatusResolver: Send + Sync {
    fn is_revoked(&self, certificate: &Certificate) -> Result<bool, WebauthnError>;
}

/// What the relying party knows about an authenticator model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorMetadata {
    pub aaguid: Aaguid,
    pub description: String,
    pub attestation_types: Vec<AttestationType>,
    pub root_certificates: Vec<Certificate>,
}

pub trait MetadataResolver: Send + Sync {
    fn metadata(&self, result: &RegistrationResult) -> Option<AuthenticatorMetadata>;
}

/// Final accept/reject decision on a verified registration.
pub trait TrustDecisionManager: Send + Sync {
    fn decide(
        &self,
        result: &RegistrationResult,
        metadata: Option<&AuthenticatorMetadata>,
    ) -> Result<(), WebauthnError>;
}

/// Accepts every registration whose attestation verified.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TrustDecisionManager for AcceptAll {
    fn decide(
        &self,
        _result: &RegistrationResult,
        _metadata: Option<&AuthenticatorMetadata>,
    ) -> Result<(), WebauthnError> {
        Ok(())
    }
}

/// Requires metadata for the authenticator and an attestation type the
/// metadata lists. When the metadata carries root certificates the trust
/// path must chain to one of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireKnownAuthenticator;

impl TrustDecisionManager for RequireKnownAuthenticator {
    fn decide(
        &self,
        result: &RegistrationResult,
        metadata: Option<&AuthenticatorMetadata>,
    ) -> Result<(), WebauthnError> {
        let Some(metadata) = metadata else {
            return Err(WebauthnError::Verification(format!(
                "No metadata for authenticator {}",
                result.aaguid
            )));
        };
        let attestation_type = result.verification.attestation_type;
        if !metadata.attestation_types.contains(&attestation_type) {
            return Err(WebauthnError::Verification(format!(
                "Attestation type {attestation_type:?} is not listed for {}",
                metadata.description
            )));
        }

        let trust_path = result.verification.trust_path.certificates();
        if !metadata.root_certificates.is_empty() && !trust_path.is_empty() {
            TrustAnchorValidator::new(metadata.root_certificates.clone()).validate(trust_path)?;
        }
        Ok(())
    }
}
