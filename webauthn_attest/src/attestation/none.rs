use crate::errors::WebauthnError;

use super::types::{AttestationType, TrustPath, VerificationResult};

/// `none` carries no attestation; the statement was already checked to be
/// an empty map when it was constructed.
pub(super) fn verify_none_attestation() -> Result<VerificationResult, WebauthnError> {
    tracing::debug!("No attestation provided by the authenticator");
    Ok(VerificationResult::new(
        AttestationType::None,
        TrustPath::Empty,
    ))
}
