use crate::cose::{CoseAlgorithm, CoseKey, EcCurve};
use crate::errors::WebauthnError;

use super::authenticator_data::AuthenticatorData;
use super::statement::FidoU2fStatement;
use super::types::{AttestationFormat, AttestationType, TrustPath, VerificationResult};
use super::utils::{credential_data, verify_certificate_signature};

/// Verifies a FIDO U2F attestation statement
///
/// # Arguments
/// * `statement` - The validated fido-u2f attestation statement
/// * `auth_data` - The parsed authenticator data
/// * `client_data_hash` - SHA-256 of the client data JSON
///
/// # Returns
/// * `{Basic, Certificates(x5c)}` when the attestation signature verifies
///
/// # Errors
/// * `WebauthnError::Verification` - If any U2F requirement is not met
///
pub(super) fn verify_u2f_attestation(
    statement: &FidoU2fStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<VerificationResult, WebauthnError> {
    let credential = credential_data(auth_data)?;

    // 1. U2F authenticators have no AAGUID
    if !credential.aaguid().is_zero() {
        return Err(WebauthnError::Verification(
            "fido-u2f attestation requires an all-zero AAGUID".to_string(),
        ));
    }

    // 2. Exactly one attestation certificate with an EC P-256 key
    let [certificate] = statement.certificates.as_slice() else {
        return Err(WebauthnError::Verification(format!(
            "fido-u2f attestation requires exactly one certificate, got {}",
            statement.certificates.len()
        )));
    };
    if certificate.public_key().ec_curve() != Some(EcCurve::P256) {
        return Err(WebauthnError::Verification(
            "fido-u2f attestation certificate key must be an EC P-256 key".to_string(),
        ));
    }

    // 3. The credential key re-encoded as a raw U2F public key
    let public_key_u2f = match credential.credential_public_key() {
        CoseKey::Ec2(key) if key.curve() == EcCurve::P256 => key.uncompressed_point(),
        other => {
            return Err(WebauthnError::Verification(format!(
                "fido-u2f credential public key must be an EC2 P-256 key, got {}",
                other.algorithm()
            )));
        }
    };

    // 4. verificationData = 0x00 || rpIdHash || clientDataHash || credentialId || publicKeyU2F
    let credential_id = credential.credential_id().as_slice();
    let mut verification_data = Vec::with_capacity(
        1 + 32 + client_data_hash.len() + credential_id.len() + public_key_u2f.len(),
    );
    verification_data.push(0x00);
    verification_data.extend_from_slice(auth_data.rp_id_hash());
    verification_data.extend_from_slice(client_data_hash);
    verification_data.extend_from_slice(credential_id);
    verification_data.extend_from_slice(&public_key_u2f);

    verify_certificate_signature(
        certificate,
        CoseAlgorithm::ES256,
        &verification_data,
        statement.signature.as_slice(),
        AttestationFormat::FidoU2f,
    )?;

    Ok(VerificationResult::new(
        AttestationType::Basic,
        TrustPath::Certificates(statement.certificates.clone()),
    ))
}
