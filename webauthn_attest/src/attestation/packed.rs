use crate::errors::WebauthnError;
use crate::pki::{Certificate, OID_COUNTRY_NAME, OID_ORGANIZATION_NAME};

use super::authenticator_data::AuthenticatorData;
use super::statement::{AttestationPath, PackedStatement};
use super::types::{Aaguid, AttestationFormat, AttestationType, TrustPath, VerificationResult};
use super::utils::{
    check_aaguid_extension, credential_data, leading_certificate, signed_data,
    verify_certificate_signature,
};

const ATTESTATION_OU: &str = "Authenticator Attestation";

/// Verifies a packed attestation statement
///
/// # Arguments
/// * `statement` - The validated packed attestation statement
/// * `auth_data` - The parsed authenticator data
/// * `client_data_hash` - SHA-256 of the client data JSON
///
/// # Returns
/// * `{Basic, Certificates(x5c)}` for full attestation
/// * `{SelfAttestation, Empty}` when the credential key signed its own statement
///
/// # Errors
/// * `WebauthnError::Verification` - If the attestation is invalid
/// * `WebauthnError::Unsupported` - For ECDAA attestation
///
pub(super) fn verify_packed_attestation(
    statement: &PackedStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<VerificationResult, WebauthnError> {
    let credential = credential_data(auth_data)?;
    let data = signed_data(auth_data, client_data_hash);

    match &statement.path {
        AttestationPath::X5c(certificates) => {
            tracing::debug!("Full attestation with certificate chain");
            let certificate = leading_certificate(certificates, AttestationFormat::Packed)?;
            verify_certificate_signature(
                certificate,
                statement.algorithm,
                &data,
                statement.signature.as_slice(),
                AttestationFormat::Packed,
            )?;
            verify_packed_attestation_cert(certificate, credential.aaguid())?;
            Ok(VerificationResult::new(
                AttestationType::Basic,
                TrustPath::Certificates(certificates.clone()),
            ))
        }
        AttestationPath::Ecdaa(_) => Err(WebauthnError::Unsupported(
            "ECDAA attestation is not supported".to_string(),
        )),
        AttestationPath::SelfAttested => {
            tracing::debug!("Self attestation");
            let public_key = credential.credential_public_key();
            if public_key.algorithm() != statement.algorithm {
                return Err(WebauthnError::Verification(format!(
                    "Self attestation algorithm {} does not match the credential key algorithm {}",
                    statement.algorithm,
                    public_key.algorithm()
                )));
            }
            if !public_key.verify_signature(&data, statement.signature.as_slice())? {
                return Err(WebauthnError::Verification(
                    "packed self attestation signature is invalid".to_string(),
                ));
            }
            Ok(VerificationResult::new(
                AttestationType::SelfAttestation,
                TrustPath::Empty,
            ))
        }
    }
}

/// Packed attestation statement certificate requirements (WebAuthn §8.2.1).
fn verify_packed_attestation_cert(
    certificate: &Certificate,
    aaguid: Aaguid,
) -> Result<(), WebauthnError> {
    let details = certificate.details();

    // 1. Version MUST be set to 3
    if details.version() != 3 {
        return Err(WebauthnError::Verification(format!(
            "Attestation certificate version must be 3, got {}",
            details.version()
        )));
    }

    // 2. Subject-OU MUST be the literal "Authenticator Attestation"
    if details.organizational_unit() != Some(ATTESTATION_OU) {
        return Err(WebauthnError::Verification(format!(
            "Attestation certificate subject OU must be \"{ATTESTATION_OU}\""
        )));
    }

    // 3. Subject-C, Subject-O and Subject-CN must be present
    for (oid, name) in [
        (OID_COUNTRY_NAME, "C"),
        (OID_ORGANIZATION_NAME, "O"),
    ] {
        if details.subject_attribute(oid).is_none_or(str::is_empty) {
            return Err(WebauthnError::Verification(format!(
                "Attestation certificate subject is missing {name}"
            )));
        }
    }
    if details.common_name().is_none_or(str::is_empty) {
        return Err(WebauthnError::Verification(
            "Attestation certificate subject is missing CN".to_string(),
        ));
    }

    // 4. Basic Constraints CA MUST be false
    if details.is_ca() {
        return Err(WebauthnError::Verification(
            "Attestation certificate must not be a CA certificate".to_string(),
        ));
    }

    // 5. AAGUID extension, when present, must match
    check_aaguid_extension(certificate, aaguid)
}
