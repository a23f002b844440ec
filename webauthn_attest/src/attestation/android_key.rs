use crate::errors::WebauthnError;
use crate::pki::{AndroidKeyDescription, OID_ANDROID_KEY_ATTESTATION};
use crate::utils::ct_eq;

use super::authenticator_data::AuthenticatorData;
use super::statement::AndroidKeyStatement;
use super::types::{AttestationFormat, AttestationType, TrustPath, VerificationResult};
use super::utils::{
    credential_data, leading_certificate, signed_data, verify_certificate_signature,
};

/// Verifies an Android Key attestation statement
///
/// # Arguments
/// * `statement` - The validated android-key attestation statement
/// * `auth_data` - The parsed authenticator data
/// * `client_data_hash` - SHA-256 of the client data JSON
///
/// # Errors
/// * `WebauthnError::Verification` - If the attestation is invalid
///
pub(super) fn verify_android_key_attestation(
    statement: &AndroidKeyStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<VerificationResult, WebauthnError> {
    let credential = credential_data(auth_data)?;
    let certificate = leading_certificate(&statement.certificates, AttestationFormat::AndroidKey)?;

    // 1. The attested key is the credential key
    let credential_der = credential.credential_public_key().as_der();
    if !ct_eq(certificate.public_key().der().as_slice(), &credential_der) {
        return Err(WebauthnError::Verification(
            "Android key attestation certificate key does not match the credential public key"
                .to_string(),
        ));
    }

    // 2. Signature over authenticatorData || clientDataHash
    verify_certificate_signature(
        certificate,
        statement.algorithm,
        &signed_data(auth_data, client_data_hash),
        statement.signature.as_slice(),
        AttestationFormat::AndroidKey,
    )?;

    // 3. Key description extension
    let extension = certificate
        .details()
        .extension(OID_ANDROID_KEY_ATTESTATION)
        .ok_or_else(|| {
            WebauthnError::Verification(
                "Android key attestation certificate is missing the key description extension"
                    .to_string(),
            )
        })?;
    let description = AndroidKeyDescription::parse(extension.value.as_slice())?;
    tracing::debug!(
        "Android key attestation version {} security level {}",
        description.attestation_version,
        description.attestation_security_level
    );

    if !ct_eq(&description.attestation_challenge, client_data_hash) {
        return Err(WebauthnError::Verification(
            "Android key attestation challenge does not match the client data hash".to_string(),
        ));
    }

    // 4. Key must be scoped to the relying party
    if description.software_enforced.all_applications || description.tee_enforced.all_applications
    {
        return Err(WebauthnError::Verification(
            "Android key attestation must not be valid for all applications".to_string(),
        ));
    }

    // 5. Generated in the keystore for signing only
    if !description.tee_enforced.is_generated_signing_key()
        && !description.software_enforced.is_generated_signing_key()
    {
        return Err(WebauthnError::Verification(
            "Android key attestation key must be generated for signing".to_string(),
        ));
    }

    Ok(VerificationResult::new(
        AttestationType::Basic,
        TrustPath::Certificates(statement.certificates.clone()),
    ))
}
