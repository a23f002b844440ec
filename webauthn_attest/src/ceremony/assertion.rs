use std::sync::Arc;

use crate::attestation::AuthenticatorData;
use crate::buffer::ByteBuffer;
use crate::config::RelyingPartyConfig;
use crate::errors::WebauthnError;
use crate::utils::ct_eq;

use super::client_data::{CollectedClientData, TYPE_GET};
use super::collaborators::{CredentialStore, StoredCredential};
use super::registration::verify_authenticator_data;

/// What the relying party issued when the authentication ceremony started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionContext {
    pub challenge: Vec<u8>,
    /// `allowCredentials`; empty means a discoverable credential flow.
    pub allow_credentials: Vec<Vec<u8>>,
    /// The user the ceremony is for, when already identified.
    pub user_handle: Option<Vec<u8>>,
}

impl AssertionContext {
    pub fn new(challenge: impl Into<Vec<u8>>) -> Self {
        Self {
            challenge: challenge.into(),
            allow_credentials: Vec::new(),
            user_handle: None,
        }
    }

    pub fn with_allow_credentials(mut self, credential_ids: Vec<Vec<u8>>) -> Self {
        self.allow_credentials = credential_ids;
        self
    }

    pub fn with_user_handle(mut self, user_handle: impl Into<Vec<u8>>) -> Self {
        self.user_handle = Some(user_handle.into());
        self
    }

    fn is_discoverable(&self) -> bool {
        self.allow_credentials.is_empty()
    }
}

/// `AuthenticatorAssertionResponse` fields plus the credential id,
/// already base64url decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorAssertion {
    pub credential_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// What to do when the signature counter did not increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClonePolicy {
    #[default]
    Reject,
    /// Accept the assertion and report `CounterStatus::PossibleClone`.
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStatus {
    Incremented,
    /// Both stored and received counters are zero.
    Unsupported,
    PossibleClone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertionResult {
    pub credential_id: ByteBuffer,
    pub user_handle: Vec<u8>,
    pub sign_count: u32,
    pub counter_status: CounterStatus,
    pub authenticator_data: AuthenticatorData,
}

/// Verifies `navigator.credentials.get()` responses against stored credentials.
#[derive(Clone)]
pub struct AssertionVerifier {
    config: RelyingPartyConfig,
    credential_store: Arc<dyn CredentialStore>,
    clone_policy: ClonePolicy,
}

impl AssertionVerifier {
    pub fn new(config: RelyingPartyConfig, credential_store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            credential_store,
            clone_policy: ClonePolicy::default(),
        }
    }

    pub fn with_clone_policy(mut self, policy: ClonePolicy) -> Self {
        self.clone_policy = policy;
        self
    }

    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    /// Verifies an authentication response
    ///
    /// # Arguments
    /// * `context` - Challenge, allowed credentials and expected user for this ceremony
    /// * `response` - The authenticator's assertion response
    ///
    /// # Returns
    /// * The authenticated credential, its owner and the counter outcome
    ///
    /// # Errors
    /// * `WebauthnError::Credential` - Unknown credential, not in the allow list, or wrong owner
    /// * `WebauthnError::ClientData` / `WebauthnError::Challenge` - If the client data does not match
    /// * `WebauthnError::AuthenticatorData` - If flags or RP ID hash do not match
    /// * `WebauthnError::Verification` - Bad signature, or a possible clone under `ClonePolicy::Reject`
    ///
    pub fn verify(
        &self,
        context: &AssertionContext,
        response: &AuthenticatorAssertion,
    ) -> Result<AssertionResult, WebauthnError> {
        self.config.validate()?;

        // 1. Credential lookup
        if !context.is_discoverable()
            && !context
                .allow_credentials
                .iter()
                .any(|id| ct_eq(id, &response.credential_id))
        {
            return Err(WebauthnError::Credential(
                "Credential is not in the allow list".to_string(),
            ));
        }

        let stored = self
            .credential_store
            .find_credential(&response.credential_id)?
            .ok_or_else(|| WebauthnError::Credential("Unknown credential".to_string()))?;

        // 2. Credential owner
        verify_user_handle(context, response, &stored)?;

        // 3. Client data
        let client_data = CollectedClientData::parse(&response.client_data_json)?;
        client_data.verify(TYPE_GET, &context.challenge, &self.config)?;

        // 4. Authenticator data
        let auth_data = AuthenticatorData::parse(ByteBuffer::new(response.authenticator_data.clone()))?;
        verify_authenticator_data(&auth_data, &self.config)?;

        // 5. Signature over authData || SHA-256(clientDataJSON)
        let signed = auth_data.raw().concat(&client_data.hash());
        if !stored
            .public_key
            .verify_signature(signed.as_slice(), &response.signature)?
        {
            tracing::debug!(
                "Assertion signature rejected for credential {}",
                ByteBuffer::new(stored.credential_id.clone()).to_hex()
            );
            return Err(WebauthnError::Verification(
                "Assertion signature verification failed".to_string(),
            ));
        }

        // 6. Signature counter
        let counter_status = verify_counter(stored.sign_count, auth_data.sign_count());
        match counter_status {
            CounterStatus::PossibleClone => {
                tracing::warn!(
                    "Counter did not increase - stored: {}, received: {}",
                    stored.sign_count,
                    auth_data.sign_count()
                );
                if self.clone_policy == ClonePolicy::Reject {
                    return Err(WebauthnError::Verification(
                        "Signature counter did not increase - possible credential cloning"
                            .to_string(),
                    ));
                }
            }
            CounterStatus::Incremented => {
                self.credential_store
                    .update_sign_count(&stored.credential_id, auth_data.sign_count())?;
            }
            CounterStatus::Unsupported => {
                tracing::debug!("Authenticator does not support signature counters");
            }
        }

        Ok(AssertionResult {
            credential_id: ByteBuffer::new(stored.credential_id),
            user_handle: stored.user_handle,
            sign_count: auth_data.sign_count(),
            counter_status,
            authenticator_data: auth_data,
        })
    }
}

fn verify_user_handle(
    context: &AssertionContext,
    response: &AuthenticatorAssertion,
    stored: &StoredCredential,
) -> Result<(), WebauthnError> {
    match &response.user_handle {
        Some(handle) if !ct_eq(handle, &stored.user_handle) => {
            tracing::debug!("User handle does not match the credential owner");
            return Err(WebauthnError::Credential("User handle mismatch".to_string()));
        }
        None if context.is_discoverable() => {
            return Err(WebauthnError::Credential(
                "Missing required user handle for discoverable credential".to_string(),
            ));
        }
        _ => {}
    }

    if let Some(expected) = &context.user_handle {
        if !ct_eq(expected, &stored.user_handle) {
            return Err(WebauthnError::Credential(
                "Credential does not belong to the expected user".to_string(),
            ));
        }
    }
    Ok(())
}

/// Once either counter is nonzero the received value must be strictly greater.
fn verify_counter(stored: u32, received: u32) -> CounterStatus {
    if stored == 0 && received == 0 {
        CounterStatus::Unsupported
    } else if received > stored {
        CounterStatus::Incremented
    } else {
        CounterStatus::PossibleClone
    }
}
