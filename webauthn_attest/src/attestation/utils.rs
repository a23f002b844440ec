use crate::cose::CoseAlgorithm;
use crate::errors::WebauthnError;
use crate::pki::{Certificate, OID_FIDO_GEN_CE_AAGUID, parse_aaguid_extension};

use super::authenticator_data::{AttestedCredentialData, AuthenticatorData};
use super::types::{AttestationFormat, Aaguid};

/// `authenticatorData || clientDataHash`, the payload most formats sign.
pub(super) fn signed_data(auth_data: &AuthenticatorData, client_data_hash: &[u8]) -> Vec<u8> {
    auth_data.raw().concat(client_data_hash).into_vec()
}

pub(super) fn credential_data(
    auth_data: &AuthenticatorData,
) -> Result<&AttestedCredentialData, WebauthnError> {
    auth_data.attested_credential_data().ok_or_else(|| {
        WebauthnError::Verification(
            "Authenticator data does not contain attested credential data".to_string(),
        )
    })
}

pub(super) fn leading_certificate(
    certificates: &[Certificate],
    format: AttestationFormat,
) -> Result<&Certificate, WebauthnError> {
    certificates.first().ok_or_else(|| {
        WebauthnError::Verification(format!("{format} attestation has no certificate"))
    })
}

/// Verifies `signature` with the certificate key, failing on a bad signature.
pub(super) fn verify_certificate_signature(
    certificate: &Certificate,
    algorithm: CoseAlgorithm,
    data: &[u8],
    signature: &[u8],
    format: AttestationFormat,
) -> Result<(), WebauthnError> {
    if !certificate.verify_signature(data, signature, algorithm)? {
        tracing::debug!("{format} attestation signature check failed with {algorithm}");
        return Err(WebauthnError::Verification(format!(
            "{format} attestation signature is invalid"
        )));
    }
    Ok(())
}

/// When the certificate carries id-fido-gen-ce-aaguid it must be
/// non-critical and match the AAGUID in the authenticator data.
pub(super) fn check_aaguid_extension(
    certificate: &Certificate,
    aaguid: Aaguid,
) -> Result<(), WebauthnError> {
    let Some(extension) = certificate.details().extension(OID_FIDO_GEN_CE_AAGUID) else {
        return Ok(());
    };
    if extension.critical {
        return Err(WebauthnError::Verification(
            "The id-fido-gen-ce-aaguid extension must not be marked critical".to_string(),
        ));
    }
    let cert_aaguid = Aaguid::new(parse_aaguid_extension(extension.value.as_slice())?);
    tracing::debug!("Certificate AAGUID: {cert_aaguid}, authenticator AAGUID: {aaguid}");
    if cert_aaguid != aaguid {
        return Err(WebauthnError::Verification(
            "AAGUID mismatch between certificate and authenticator data".to_string(),
        ));
    }
    Ok(())
}
