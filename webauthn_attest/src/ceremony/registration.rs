use std::sync::Arc;

use crate::attestation::{
    Aaguid, AttestationFormat, AttestationObject, AttestationVerifiers, AuthenticatorData,
    VerificationResult,
};
use crate::buffer::ByteBuffer;
use crate::config::{RelyingPartyConfig, UserVerificationRequirement};
use crate::cose::{CoseAlgorithm, CoseKey};
use crate::errors::WebauthnError;
use crate::utils::ct_eq;

use super::client_data::{CollectedClientData, TYPE_CREATE};
use super::collaborators::{
    AcceptAll, CertificateStatusResolver, CredentialStore, MetadataResolver, TrustDecisionManager,
};

/// What the relying party issued when the registration ceremony started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationContext {
    pub challenge: Vec<u8>,
    pub user_handle: Vec<u8>,
    /// `pubKeyCredParams`; empty accepts any supported algorithm.
    pub allowed_algorithms: Vec<CoseAlgorithm>,
}

impl RegistrationContext {
    pub fn new(challenge: impl Into<Vec<u8>>, user_handle: impl Into<Vec<u8>>) -> Self {
        Self {
            challenge: challenge.into(),
            user_handle: user_handle.into(),
            allowed_algorithms: Vec::new(),
        }
    }

    pub fn with_allowed_algorithms(mut self, algorithms: impl Into<Vec<CoseAlgorithm>>) -> Self {
        self.allowed_algorithms = algorithms.into();
        self
    }
}

/// `AuthenticatorAttestationResponse` fields, already base64url decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorAttestation {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub credential_id: ByteBuffer,
    pub credential_public_key: CoseKey,
    pub aaguid: Aaguid,
    pub sign_count: u32,
    pub format: AttestationFormat,
    pub authenticator_data: AuthenticatorData,
    pub verification: VerificationResult,
}

/// Verifies `navigator.credentials.create()` responses.
#[derive(Clone)]
pub struct RegistrationVerifier {
    config: RelyingPartyConfig,
    attestation: AttestationVerifiers,
    credential_store: Option<Arc<dyn CredentialStore>>,
    status_resolver: Option<Arc<dyn CertificateStatusResolver>>,
    metadata_resolver: Option<Arc<dyn MetadataResolver>>,
    trust: Arc<dyn TrustDecisionManager>,
}

impl RegistrationVerifier {
    pub fn new(config: RelyingPartyConfig) -> Self {
        Self {
            config,
            attestation: AttestationVerifiers::new(),
            credential_store: None,
            status_resolver: None,
            metadata_resolver: None,
            trust: Arc::new(AcceptAll),
        }
    }

    pub fn with_attestation_verifiers(mut self, verifiers: AttestationVerifiers) -> Self {
        self.attestation = verifiers;
        self
    }

    /// Rejects already registered credential ids and stores new ones.
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn with_status_resolver(mut self, resolver: Arc<dyn CertificateStatusResolver>) -> Self {
        self.status_resolver = Some(resolver);
        self
    }

    pub fn with_metadata_resolver(mut self, resolver: Arc<dyn MetadataResolver>) -> Self {
        self.metadata_resolver = Some(resolver);
        self
    }

    pub fn with_trust_decision(mut self, trust: Arc<dyn TrustDecisionManager>) -> Self {
        self.trust = trust;
        self
    }

    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    /// Verifies a registration response
    ///
    /// # Arguments
    /// * `context` - Challenge, user handle and algorithm policy for this ceremony
    /// * `response` - The authenticator's attestation response
    ///
    /// # Returns
    /// * The new credential and the attestation verification result
    ///
    /// # Errors
    /// * `WebauthnError::Config` - If the relying party configuration is unusable
    /// * `WebauthnError::ClientData` / `WebauthnError::Challenge` - If the client data does not match
    /// * `WebauthnError::AuthenticatorData` - If flags or RP ID hash do not match
    /// * Any attestation error from the format verifier
    ///
    pub fn verify(
        &self,
        context: &RegistrationContext,
        response: &AuthenticatorAttestation,
    ) -> Result<RegistrationResult, WebauthnError> {
        self.config.validate()?;

        // 1. Client data
        let client_data = CollectedClientData::parse(&response.client_data_json)?;
        client_data.verify(TYPE_CREATE, &context.challenge, &self.config)?;
        let client_data_hash = client_data.hash();

        // 2. Attestation object and authenticator data
        let attestation =
            AttestationObject::parse(&ByteBuffer::new(response.attestation_object.clone()))?;
        let auth_data = attestation.auth_data();
        verify_authenticator_data(auth_data, &self.config)?;

        let credential = auth_data.attested_credential_data().ok_or_else(|| {
            WebauthnError::AuthenticatorData(
                "Registration requires attested credential data".to_string(),
            )
        })?;
        let algorithm = credential.credential_public_key().algorithm();
        if !context.allowed_algorithms.is_empty()
            && !context.allowed_algorithms.contains(&algorithm)
        {
            return Err(WebauthnError::AuthenticatorData(format!(
                "Credential algorithm {algorithm} was not requested"
            )));
        }

        if let Some(store) = &self.credential_store {
            if store
                .find_credential(credential.credential_id().as_slice())?
                .is_some()
            {
                return Err(WebauthnError::Credential(
                    "Credential ID is already registered".to_string(),
                ));
            }
        }

        // 3. Attestation statement
        let format = self.attestation.resolve(attestation.format())?;
        let verification = self.attestation.verify(&attestation, &client_data_hash)?;

        // 4. Revocation
        if let Some(resolver) = &self.status_resolver {
            for certificate in verification.trust_path.certificates() {
                if resolver.is_revoked(certificate)? {
                    tracing::warn!(
                        "Revoked certificate in trust path: {:?}",
                        certificate.details().common_name()
                    );
                    return Err(WebauthnError::Verification(
                        "Attestation trust path contains a revoked certificate".to_string(),
                    ));
                }
            }
        }

        let result = RegistrationResult {
            credential_id: credential.credential_id().clone(),
            credential_public_key: credential.credential_public_key().clone(),
            aaguid: credential.aaguid(),
            sign_count: auth_data.sign_count(),
            format,
            authenticator_data: auth_data.clone(),
            verification,
        };

        // 5. Trust decision
        let metadata = self
            .metadata_resolver
            .as_ref()
            .and_then(|resolver| resolver.metadata(&result));
        self.trust.decide(&result, metadata.as_ref())?;

        if let Some(store) = &self.credential_store {
            store.register_credential(&context.user_handle, &result)?;
        }

        tracing::debug!(
            "Registered credential {} from authenticator {}",
            result.credential_id.to_hex(),
            result.aaguid
        );
        Ok(result)
    }
}

/// RP ID hash and user presence/verification flags, shared by both ceremonies.
pub(super) fn verify_authenticator_data(
    auth_data: &AuthenticatorData,
    config: &RelyingPartyConfig,
) -> Result<(), WebauthnError> {
    if !ct_eq(auth_data.rp_id_hash(), &config.rp_id_hash()) {
        return Err(WebauthnError::AuthenticatorData(
            "RP ID hash does not match".to_string(),
        ));
    }

    if config.require_user_presence() && !auth_data.is_user_present() {
        return Err(WebauthnError::AuthenticatorData(
            "User not present".to_string(),
        ));
    }

    if config.user_verification() == UserVerificationRequirement::Required
        && !auth_data.is_user_verified()
    {
        return Err(WebauthnError::AuthenticatorData(format!(
            "User verification required but flag not set (flags: {:#04x})",
            auth_data.flags()
        )));
    }

    Ok(())
}
