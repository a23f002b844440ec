use crate::cose::CoseKey;
use crate::errors::WebauthnError;
use crate::pki::{Certificate, OID_TCG_KP_AIK_CERTIFICATE};
use crate::tpm::{self, TpmKeyParameters, TpmPublic, TpmUnique};
use crate::utils::ct_eq;

use super::authenticator_data::AuthenticatorData;
use super::statement::{AttestationPath, TpmStatement};
use super::types::{Aaguid, AttestationFormat, AttestationType, TrustPath, VerificationResult};
use super::utils::{
    check_aaguid_extension, credential_data, leading_certificate, signed_data,
    verify_certificate_signature,
};

/// Verifies a TPM attestation statement
///
/// # Arguments
/// * `statement` - The validated TPM attestation statement
/// * `auth_data` - The parsed authenticator data
/// * `client_data_hash` - SHA-256 of the client data JSON
///
/// # Returns
/// * `{AttCa, Certificates(x5c)}` when every check passes
///
/// # Errors
/// * `WebauthnError::Verification` - If the attestation is invalid
/// * `WebauthnError::Unsupported` - For ECDAA, unknown TPM curves, or
///   algorithms without a digest
///
pub(super) fn verify_tpm_attestation(
    statement: &TpmStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<VerificationResult, WebauthnError> {
    let credential = credential_data(auth_data)?;

    // 1. The key in pubArea must be the credential public key
    verify_public_key_match(&statement.pub_area, credential.credential_public_key())?;

    // 2. extraData must be the hash of attToBeSigned under the statement's alg
    let hash = statement.algorithm.hash_algorithm().ok_or_else(|| {
        WebauthnError::Unsupported(format!(
            "TPM attestation with algorithm {} has no digest for extraData",
            statement.algorithm
        ))
    })?;
    let att_to_be_signed = signed_data(auth_data, client_data_hash);
    if !ct_eq(
        &hash.digest(&att_to_be_signed),
        statement.cert_info.extra_data().as_slice(),
    ) {
        return Err(WebauthnError::Verification(
            "TPM certInfo extraData does not match the hash of attToBeSigned".to_string(),
        ));
    }

    // 3. attested name must be the name of pubArea
    if !statement
        .pub_area
        .is_valid_pub_info_name(statement.cert_info.attested_name())?
    {
        return Err(WebauthnError::Verification(
            "TPM certInfo attested name does not match pubArea".to_string(),
        ));
    }

    // 4. Signature over certInfo with the AIK certificate
    let certificates = match &statement.path {
        AttestationPath::X5c(certificates) => certificates,
        AttestationPath::Ecdaa(_) => {
            return Err(WebauthnError::Unsupported(
                "ECDAA attestation is not supported".to_string(),
            ));
        }
        AttestationPath::SelfAttested => {
            return Err(WebauthnError::Verification(
                "TPM attestation requires an AIK certificate".to_string(),
            ));
        }
    };
    let aik = leading_certificate(certificates, AttestationFormat::Tpm)?;
    verify_certificate_signature(
        aik,
        statement.algorithm,
        statement.cert_info.raw().as_slice(),
        statement.signature.as_slice(),
        AttestationFormat::Tpm,
    )?;

    // 5. AIK certificate requirements
    verify_aik_certificate(aik, credential.aaguid())?;

    Ok(VerificationResult::new(
        AttestationType::AttCa,
        TrustPath::Certificates(certificates.clone()),
    ))
}

fn verify_public_key_match(pub_area: &TpmPublic, key: &CoseKey) -> Result<(), WebauthnError> {
    match (pub_area.parameters(), pub_area.unique(), key) {
        (TpmKeyParameters::Rsa(params), TpmUnique::Rsa { modulus }, CoseKey::Rsa(key)) => {
            if !ct_eq(strip_leading_zeros(modulus.as_slice()), key.modulus().as_slice()) {
                return Err(WebauthnError::Verification(
                    "TPM pubArea modulus does not match the credential public key".to_string(),
                ));
            }
            if !ct_eq(&params.exponent_bytes(), key.exponent().as_slice()) {
                return Err(WebauthnError::Verification(
                    "TPM pubArea exponent does not match the credential public key".to_string(),
                ));
            }
            Ok(())
        }
        (TpmKeyParameters::Ecc(params), TpmUnique::Ecc { x, y }, CoseKey::Ec2(key)) => {
            let curve = tpm::ecc_curve(params.curve_id).ok_or_else(|| {
                WebauthnError::Unsupported(format!(
                    "TPM ECC curve {:#06x}",
                    params.curve_id
                ))
            })?;
            if curve != key.curve() {
                return Err(WebauthnError::Verification(format!(
                    "TPM pubArea curve {curve:?} does not match the credential key curve {:?}",
                    key.curve()
                )));
            }
            if !ct_eq(x.as_slice(), key.x().as_slice()) || !ct_eq(y.as_slice(), key.y().as_slice())
            {
                return Err(WebauthnError::Verification(
                    "TPM pubArea point does not match the credential public key".to_string(),
                ));
            }
            Ok(())
        }
        _ => Err(WebauthnError::Verification(format!(
            "TPM pubArea key type {:#06x} does not match the credential public key",
            pub_area.object_type()
        ))),
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    &bytes[skip.min(bytes.len().saturating_sub(1))..]
}

/// TCG identifiers in the SAN are written as `id:` followed by hex digits.
fn is_tcg_id(value: &str) -> bool {
    value
        .strip_prefix("id:")
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// TPM attestation statement certificate requirements (WebAuthn §8.3.1).
fn verify_aik_certificate(certificate: &Certificate, aaguid: Aaguid) -> Result<(), WebauthnError> {
    let details = certificate.details();

    // 1. Version MUST be set to 3
    if details.version() != 3 {
        return Err(WebauthnError::Verification(
            "AIK certificate version must be 3".to_string(),
        ));
    }

    // 2. Subject field MUST be set to empty
    if !details.subject_is_empty() {
        tracing::debug!("AIK certificate subject is not empty: {:?}", details.subject());
        return Err(WebauthnError::Verification(
            "AIK certificate must have an empty subject field".to_string(),
        ));
    }

    // 3. Subject Alternative Name with the TPM device attributes
    let attributes = details.tpm_device_attributes().ok_or_else(|| {
        WebauthnError::Verification(
            "AIK certificate must have a Subject Alternative Name with TPM device attributes"
                .to_string(),
        )
    })?;
    if !is_tcg_id(&attributes.manufacturer) {
        return Err(WebauthnError::Verification(format!(
            "Invalid TPM manufacturer in AIK certificate: {}",
            attributes.manufacturer
        )));
    }
    if attributes.model.is_empty() {
        return Err(WebauthnError::Verification(
            "TPM model in AIK certificate must not be empty".to_string(),
        ));
    }
    if !is_tcg_id(&attributes.version) {
        return Err(WebauthnError::Verification(format!(
            "Invalid TPM version in AIK certificate: {}",
            attributes.version
        )));
    }

    // 4. Extended Key Usage MUST contain tcg-kp-AIKCertificate
    if !details.has_extended_key_usage(OID_TCG_KP_AIK_CERTIFICATE) {
        return Err(WebauthnError::Verification(
            "AIK certificate must have the tcg-kp-AIKCertificate extended key usage".to_string(),
        ));
    }

    // 5. Basic Constraints CA MUST be false
    if details.is_ca() {
        return Err(WebauthnError::Verification(
            "AIK certificate must not be a CA certificate".to_string(),
        ));
    }

    // 6. AAGUID extension, when present, must match
    check_aaguid_extension(certificate, aaguid)
}
