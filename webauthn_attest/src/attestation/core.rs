use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::errors::WebauthnError;
use crate::pki::ChainValidator;

use super::android_key::verify_android_key_attestation;
use super::android_safetynet::verify_safetynet_attestation;
use super::apple::verify_apple_attestation;
use super::none::verify_none_attestation;
use super::object::AttestationObject;
use super::packed::verify_packed_attestation;
use super::statement::AttestationStatement;
use super::tpm::verify_tpm_attestation;
use super::types::{AttestationFormat, VerificationResult};
use super::u2f::verify_u2f_attestation;

/// Registry of attestation statement verifiers keyed by format identifier.
///
/// Every format is enabled by default. SafetyNet additionally needs a chain
/// validator holding the Google roots; without one it fails with a
/// configuration error.
#[derive(Clone)]
pub struct AttestationVerifiers {
    enabled: HashSet<AttestationFormat>,
    safetynet_trust: Option<Arc<dyn ChainValidator>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AttestationVerifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationVerifiers")
            .field("enabled", &self.supported_formats())
            .field("safetynet_trust", &self.safetynet_trust.is_some())
            .finish()
    }
}

impl Default for AttestationVerifiers {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationVerifiers {
    pub fn new() -> Self {
        Self {
            enabled: AttestationFormat::ALL.into_iter().collect(),
            safetynet_trust: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Restricts the registry to the given formats.
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = AttestationFormat>) -> Self {
        self.enabled = formats.into_iter().collect();
        self
    }

    pub fn with_safetynet_trust(mut self, validator: Arc<dyn ChainValidator>) -> Self {
        self.safetynet_trust = Some(validator);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enabled formats in registry order.
    pub fn supported_formats(&self) -> Vec<AttestationFormat> {
        AttestationFormat::ALL
            .into_iter()
            .filter(|format| self.enabled.contains(format))
            .collect()
    }

    /// Resolves a format identifier against the registry.
    ///
    /// # Errors
    /// * `WebauthnError::FormatNotSupported` - If the identifier is unknown or disabled
    ///
    pub fn resolve(&self, format: &str) -> Result<AttestationFormat, WebauthnError> {
        let resolved: AttestationFormat = format.parse()?;
        if !self.enabled.contains(&resolved) {
            return Err(WebauthnError::FormatNotSupported(format.to_string()));
        }
        Ok(resolved)
    }

    /// Validates the statement of an attestation object and runs the
    /// matching format verifier.
    ///
    /// # Arguments
    /// * `attestation` - The decoded attestation object
    /// * `client_data_hash` - SHA-256 of the client data JSON
    ///
    /// # Returns
    /// * The attestation type and trust path established by the verifier
    ///
    /// # Errors
    /// * `WebauthnError::FormatNotSupported` - If `fmt` has no enabled verifier
    /// * `WebauthnError::Parse` - If the statement does not match the format schema
    /// * `WebauthnError::Verification` - If a verification check fails
    ///
    pub fn verify(
        &self,
        attestation: &AttestationObject,
        client_data_hash: &[u8],
    ) -> Result<VerificationResult, WebauthnError> {
        let format = self.resolve(attestation.format())?;
        tracing::debug!("Using '{}' attestation format", format);

        let statement = AttestationStatement::from_map(format, attestation.statement())?;
        let auth_data = attestation.auth_data();

        let result = match &statement {
            AttestationStatement::None => verify_none_attestation(),
            AttestationStatement::FidoU2f(stmt) => {
                verify_u2f_attestation(stmt, auth_data, client_data_hash)
            }
            AttestationStatement::Packed(stmt) => {
                verify_packed_attestation(stmt, auth_data, client_data_hash)
            }
            AttestationStatement::Tpm(stmt) => {
                verify_tpm_attestation(stmt, auth_data, client_data_hash)
            }
            AttestationStatement::AndroidKey(stmt) => {
                verify_android_key_attestation(stmt, auth_data, client_data_hash)
            }
            AttestationStatement::AndroidSafetyNet(stmt) => verify_safetynet_attestation(
                stmt,
                auth_data,
                client_data_hash,
                self.safetynet_trust.as_deref(),
                self.clock.as_ref(),
            ),
            AttestationStatement::Apple(stmt) => {
                verify_apple_attestation(stmt, auth_data, client_data_hash)
            }
        };

        match &result {
            Ok(verified) => tracing::debug!(
                "'{}' attestation verified: {:?}",
                format,
                verified.attestation_type
            ),
            Err(e) => tracing::debug!("'{}' attestation rejected: {}", format, e),
        }
        result
    }
}
