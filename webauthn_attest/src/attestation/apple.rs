use crate::errors::WebauthnError;
use crate::pki::{OID_APPLE_NONCE, parse_apple_nonce};
use crate::utils::{ct_eq, sha256};

use super::authenticator_data::AuthenticatorData;
use super::statement::AppleStatement;
use super::types::{AttestationFormat, AttestationType, TrustPath, VerificationResult};
use super::utils::{credential_data, leading_certificate, signed_data};

/// Verifies an Apple anonymous attestation statement.
///
/// The credential certificate binds the ceremony through a nonce extension
/// and must certify the credential public key itself.
pub(super) fn verify_apple_attestation(
    statement: &AppleStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<VerificationResult, WebauthnError> {
    let credential = credential_data(auth_data)?;
    let certificate = leading_certificate(&statement.certificates, AttestationFormat::Apple)?;

    let nonce = sha256(&signed_data(auth_data, client_data_hash));

    let extension = certificate
        .details()
        .extension(OID_APPLE_NONCE)
        .ok_or_else(|| {
            WebauthnError::Verification(
                "Apple attestation certificate is missing the nonce extension".to_string(),
            )
        })?;
    let cert_nonce = parse_apple_nonce(extension.value.as_slice())?;
    if !ct_eq(&cert_nonce, &nonce) {
        return Err(WebauthnError::Verification(
            "The nonce in certificate extension does not match the calculated nonce".to_string(),
        ));
    }

    let credential_der = credential.credential_public_key().as_der();
    if !ct_eq(certificate.public_key().der().as_slice(), &credential_der) {
        return Err(WebauthnError::Verification(
            "Apple attestation certificate key does not match the credential public key"
                .to_string(),
        ));
    }

    Ok(VerificationResult::new(
        AttestationType::AnonCa,
        TrustPath::Certificates(statement.certificates.clone()),
    ))
}
