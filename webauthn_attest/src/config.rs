use std::env;
use std::fmt;
use std::str::FromStr;

use crate::errors::WebauthnError;
use crate::utils::sha256;

/// How strictly the UV flag is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserVerificationRequirement {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl UserVerificationRequirement {
    pub fn as_str(self) -> &'static str {
        match self {
            UserVerificationRequirement::Required => "required",
            UserVerificationRequirement::Preferred => "preferred",
            UserVerificationRequirement::Discouraged => "discouraged",
        }
    }
}

impl FromStr for UserVerificationRequirement {
    type Err = WebauthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "required" => Ok(UserVerificationRequirement::Required),
            "preferred" => Ok(UserVerificationRequirement::Preferred),
            "discouraged" => Ok(UserVerificationRequirement::Discouraged),
            other => Err(WebauthnError::Config(format!(
                "Invalid user verification requirement: {other}"
            ))),
        }
    }
}

impl fmt::Display for UserVerificationRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relying party identity and ceremony policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingPartyConfig {
    rp_id: String,
    origins: Vec<String>,
    user_verification: UserVerificationRequirement,
    require_user_presence: bool,
}

impl RelyingPartyConfig {
    pub fn new(rp_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            rp_id: rp_id.into(),
            origins: vec![origin.into()],
            user_verification: UserVerificationRequirement::default(),
            require_user_presence: true,
        }
    }

    /// Builds the configuration from `ORIGIN`, `PASSKEY_RP_ID`,
    /// `PASSKEY_ADDITIONAL_ORIGINS` and `PASSKEY_USER_VERIFICATION`, after
    /// loading a `.env` file if one exists.
    ///
    /// # Errors
    /// * `WebauthnError::Config` - If `ORIGIN` is unset or the result is invalid
    ///
    pub fn from_env() -> Result<Self, WebauthnError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WebauthnError> {
        let origin = lookup("ORIGIN")
            .filter(|origin| !origin.is_empty())
            .ok_or_else(|| WebauthnError::Config("ORIGIN must be set".to_string()))?;

        let rp_id = match lookup("PASSKEY_RP_ID") {
            Some(rp_id) => rp_id,
            None => rp_id_from_origin(&origin).ok_or_else(|| {
                WebauthnError::Config(format!("Could not extract RP ID from ORIGIN: {origin}"))
            })?,
        };

        let mut config = Self::new(rp_id, origin);
        if let Some(additional) = lookup("PASSKEY_ADDITIONAL_ORIGINS") {
            for origin in additional.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                config = config.with_origin(origin);
            }
        }

        let user_verification = lookup("PASSKEY_USER_VERIFICATION").map_or(
            UserVerificationRequirement::default(),
            |v| {
                v.parse().unwrap_or_else(|_| {
                    tracing::warn!("Invalid user verification: {}. Using default 'preferred'", v);
                    UserVerificationRequirement::default()
                })
            },
        );

        let config = config.with_user_verification(user_verification);
        config.validate()?;
        Ok(config)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        if !self.origins.contains(&origin) {
            self.origins.push(origin);
        }
        self
    }

    pub fn with_user_verification(mut self, requirement: UserVerificationRequirement) -> Self {
        self.user_verification = requirement;
        self
    }

    pub fn with_user_presence(mut self, required: bool) -> Self {
        self.require_user_presence = required;
        self
    }

    /// Checks the configuration can drive a ceremony.
    pub fn validate(&self) -> Result<(), WebauthnError> {
        if self.rp_id.is_empty() {
            return Err(WebauthnError::Config("RP ID must not be empty".to_string()));
        }
        if self.origins.is_empty() || self.origins.iter().any(String::is_empty) {
            return Err(WebauthnError::Config(
                "At least one non-empty origin must be configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn rp_id_hash(&self) -> [u8; 32] {
        sha256(self.rp_id.as_bytes())
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    pub fn user_verification(&self) -> UserVerificationRequirement {
        self.user_verification
    }

    pub fn require_user_presence(&self) -> bool {
        self.require_user_presence
    }
}

fn rp_id_from_origin(origin: &str) -> Option<String> {
    origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split([':', '/'])
        .next()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}
