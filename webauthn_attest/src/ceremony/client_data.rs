use serde::Deserialize;

use crate::config::RelyingPartyConfig;
use crate::errors::WebauthnError;
use crate::utils::{base64url_decode, ct_eq, sha256};

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

pub(super) const TYPE_CREATE: &str = "webauthn.create";
pub(super) const TYPE_GET: &str = "webauthn.get";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenBinding {
    pub status: String,
    pub id: Option<String>,
}

/// The client data JSON collected by the browser for a ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedClientData {
    pub type_: String,
    /// base64url encoded
    pub challenge: String,
    pub origin: String,
    pub cross_origin: bool,
    pub token_binding: Option<TokenBinding>,
    raw: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientDataJson {
    #[serde(rename = "type")]
    type_: String,
    challenge: String,
    origin: String,
    cross_origin: Option<bool>,
    token_binding: Option<TokenBinding>,
}

impl CollectedClientData {
    /// Parses raw client data JSON, ignoring a leading UTF-8 BOM.
    pub fn parse(raw: &[u8]) -> Result<Self, WebauthnError> {
        let json = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
        let json = std::str::from_utf8(json)
            .map_err(|e| WebauthnError::Parse(format!("Client data is not valid UTF-8: {e}")))?;
        let data: ClientDataJson = serde_json::from_str(json)
            .map_err(|e| WebauthnError::Parse(format!("Failed to parse client data JSON: {e}")))?;

        Ok(Self {
            type_: data.type_,
            challenge: data.challenge,
            origin: data.origin,
            cross_origin: data.cross_origin.unwrap_or(false),
            token_binding: data.token_binding,
            raw: raw.to_vec(),
        })
    }

    /// The bytes the hash is computed over, BOM included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn hash(&self) -> [u8; 32] {
        sha256(&self.raw)
    }

    /// Checks type, challenge, origin, cross-origin and token binding.
    ///
    /// # Arguments
    /// * `expected_type` - `webauthn.create` or `webauthn.get`
    /// * `expected_challenge` - The raw challenge issued for this ceremony
    /// * `config` - Relying party configuration holding the allowed origins
    ///
    /// # Errors
    /// * `WebauthnError::ClientData` - On a type, origin or cross-origin mismatch
    /// * `WebauthnError::Challenge` - If the challenge does not match
    /// * `WebauthnError::Unsupported` - If token binding is in use
    ///
    pub fn verify(
        &self,
        expected_type: &str,
        expected_challenge: &[u8],
        config: &RelyingPartyConfig,
    ) -> Result<(), WebauthnError> {
        // 1. Type
        if self.type_ != expected_type {
            tracing::debug!("Invalid client data type: {}", self.type_);
            return Err(WebauthnError::ClientData(format!(
                "Invalid type. Expected '{expected_type}', got '{}'",
                self.type_
            )));
        }

        // 2. Challenge
        let challenge = base64url_decode(&self.challenge)
            .map_err(|_| WebauthnError::Challenge("Challenge is not valid base64url".to_string()))?;
        if !ct_eq(&challenge, expected_challenge) {
            tracing::debug!("Challenge mismatch: {}", self.challenge);
            return Err(WebauthnError::Challenge(
                "Challenge verification failed".to_string(),
            ));
        }

        // 3. Origin
        if !config.is_allowed_origin(&self.origin) {
            tracing::debug!(
                "Invalid origin. Expected one of {:?}, got {}",
                config.origins(),
                self.origin
            );
            return Err(WebauthnError::ClientData(format!(
                "Invalid origin: {}",
                self.origin
            )));
        }

        if self.cross_origin {
            return Err(WebauthnError::ClientData(
                "Cross-origin ceremonies are not allowed".to_string(),
            ));
        }

        // 4. Token binding
        if let Some(token_binding) = &self.token_binding {
            match token_binding.status.as_str() {
                "present" => {
                    return Err(WebauthnError::Unsupported(
                        "Token binding is not supported".to_string(),
                    ));
                }
                "supported" | "not-supported" => {}
                other => {
                    return Err(WebauthnError::ClientData(format!(
                        "Invalid token binding status: {other}"
                    )));
                }
            }
        }

        Ok(())
    }
}
