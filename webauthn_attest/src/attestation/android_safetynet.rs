use jsonwebtoken::DecodingKey;
use serde::Deserialize;

use crate::clock::Clock;
use crate::errors::WebauthnError;
use crate::pki::{Certificate, ChainValidator};
use crate::utils::{base64_decode, base64_encode, base64url_decode, ct_eq, sha256};

use super::authenticator_data::AuthenticatorData;
use super::statement::AndroidSafetyNetStatement;
use super::types::{AttestationType, TrustPath, VerificationResult};
use super::utils::signed_data;

const SAFETYNET_HOSTNAME: &str = "attest.android.com";
const TIMESTAMP_MARGIN_MS: u64 = 60_000;

/// Body of the SafetyNet attestation JWS.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetResponse {
    nonce: String,
    timestamp_ms: i64,
    #[serde(default)]
    cts_profile_match: bool,
    #[serde(default)]
    basic_integrity: bool,
    apk_package_name: Option<String>,
}

/// Verifies an Android SafetyNet attestation statement
///
/// # Arguments
/// * `statement` - The validated android-safetynet attestation statement
/// * `auth_data` - The parsed authenticator data
/// * `client_data_hash` - SHA-256 of the client data JSON
/// * `chain_validator` - Validates the JWS x5c chain against trusted roots
/// * `clock` - Reference time for the response timestamp window
///
/// # Errors
/// * `WebauthnError::Config` - If no chain validator is configured
/// * `WebauthnError::Parse` - If the JWS is malformed
/// * `WebauthnError::Verification` - If the attestation is invalid
///
pub(super) fn verify_safetynet_attestation(
    statement: &AndroidSafetyNetStatement,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
    chain_validator: Option<&dyn ChainValidator>,
    clock: &dyn Clock,
) -> Result<VerificationResult, WebauthnError> {
    let chain_validator = chain_validator.ok_or_else(|| {
        WebauthnError::Config(
            "android-safetynet attestation requires a chain validator with trust anchors"
                .to_string(),
        )
    })?;
    tracing::debug!("SafetyNet response version {}", statement.version);

    let token = std::str::from_utf8(statement.response.as_slice()).map_err(|_| {
        WebauthnError::Parse("SafetyNet response is not valid UTF-8".to_string())
    })?;
    let parts: Vec<&str> = token.split('.').collect();
    let [encoded_header, encoded_payload, encoded_signature] = parts.as_slice() else {
        return Err(WebauthnError::Parse(
            "SafetyNet response is not a compact JWS".to_string(),
        ));
    };

    // 1. Certificate chain from the JWS header
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| WebauthnError::Parse(format!("Invalid SafetyNet JWS header: {e}")))?;
    let certificates = header
        .x5c
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|encoded| Certificate::from_der(base64_decode(encoded)?))
        .collect::<Result<Vec<_>, WebauthnError>>()?;
    let Some(leaf) = certificates.first() else {
        return Err(WebauthnError::Verification(
            "SafetyNet response has no x5c certificate chain".to_string(),
        ));
    };
    chain_validator.validate(&certificates)?;

    // 2. Signed by attest.android.com
    if leaf.details().common_name() != Some(SAFETYNET_HOSTNAME) {
        return Err(WebauthnError::Verification(format!(
            "SafetyNet response certificate is not issued to {SAFETYNET_HOSTNAME}"
        )));
    }

    // 3. JWS signature
    let key_bytes = leaf.public_key().key_bytes().as_slice();
    let decoding_key = if leaf.public_key().is_rsa() {
        DecodingKey::from_rsa_der(key_bytes)
    } else if leaf.public_key().ec_curve().is_some() {
        DecodingKey::from_ec_der(key_bytes)
    } else {
        return Err(WebauthnError::Unsupported(format!(
            "SafetyNet certificate key algorithm {}",
            leaf.public_key().algorithm_oid()
        )));
    };
    let message = format!("{encoded_header}.{encoded_payload}");
    let signature_valid = jsonwebtoken::crypto::verify(
        encoded_signature,
        message.as_bytes(),
        &decoding_key,
        header.alg,
    )
    .map_err(|e| WebauthnError::Verification(format!("SafetyNet JWS verification failed: {e}")))?;
    if !signature_valid {
        return Err(WebauthnError::Verification(
            "android-safetynet attestation signature is invalid".to_string(),
        ));
    }

    let response: SafetyNetResponse = serde_json::from_slice(&base64url_decode(encoded_payload)?)?;
    tracing::debug!(
        "SafetyNet response from {:?}, basic integrity {}",
        response.apk_package_name,
        response.basic_integrity
    );

    // 4. nonce = base64(SHA-256(authenticatorData || clientDataHash))
    let expected_nonce = base64_encode(&sha256(&signed_data(auth_data, client_data_hash)));
    if !ct_eq(response.nonce.as_bytes(), expected_nonce.as_bytes()) {
        return Err(WebauthnError::Verification(
            "SafetyNet response nonce does not match the authenticator data".to_string(),
        ));
    }

    // 5. Device passed the compatibility test suite
    if !response.cts_profile_match {
        return Err(WebauthnError::Verification(
            "SafetyNet response ctsProfileMatch is false".to_string(),
        ));
    }

    // 6. Response is fresh
    let now_ms = clock.now().timestamp_millis();
    if now_ms.abs_diff(response.timestamp_ms) > TIMESTAMP_MARGIN_MS {
        tracing::debug!(
            "SafetyNet timestamp {} vs now {now_ms}",
            response.timestamp_ms
        );
        return Err(WebauthnError::Verification(
            "SafetyNet response timestamp is not within a margin of one minute".to_string(),
        ));
    }

    Ok(VerificationResult::new(
        AttestationType::Basic,
        TrustPath::Certificates(certificates),
    ))
}
