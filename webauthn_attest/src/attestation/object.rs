use crate::buffer::ByteBuffer;
use crate::cbor::{self, CborMap, CborValue};
use crate::errors::WebauthnError;

use super::authenticator_data::AuthenticatorData;

const FMT: &str = "fmt";
const ATT_STMT: &str = "attStmt";
const AUTH_DATA: &str = "authData";

/// Top-level attestation envelope `{fmt, attStmt, authData}`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    format: String,
    statement: CborMap,
    auth_data: AuthenticatorData,
}

impl AttestationObject {
    pub fn parse(buffer: &ByteBuffer) -> Result<Self, WebauthnError> {
        let value = cbor::decode(buffer)?;
        let CborValue::Map(map) = value else {
            return Err(WebauthnError::Parse(format!(
                "Attestation object must be a map, got {}",
                value.type_name()
            )));
        };

        for key in map.keys() {
            let known = matches!(key.as_text(), Some(FMT | ATT_STMT | AUTH_DATA));
            if !known {
                return Err(WebauthnError::Parse(format!(
                    "Unexpected key {key} in attestation object"
                )));
            }
        }

        let format = map
            .get_text(FMT)
            .ok_or_else(|| missing(FMT))?
            .as_text()
            .ok_or_else(|| wrong_type(FMT, "a text string"))?
            .to_string();
        let statement = map
            .get_text(ATT_STMT)
            .ok_or_else(|| missing(ATT_STMT))?
            .as_map()
            .ok_or_else(|| wrong_type(ATT_STMT, "a map"))?
            .clone();
        let auth_data_raw = map
            .get_text(AUTH_DATA)
            .ok_or_else(|| missing(AUTH_DATA))?
            .as_bytes()
            .ok_or_else(|| wrong_type(AUTH_DATA, "a byte string"))?
            .clone();

        let auth_data = AuthenticatorData::parse(auth_data_raw)?;
        tracing::debug!("Parsed attestation object with format {format}");

        Ok(Self {
            format,
            statement,
            auth_data,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn statement(&self) -> &CborMap {
        &self.statement
    }

    pub fn auth_data(&self) -> &AuthenticatorData {
        &self.auth_data
    }

    pub fn auth_data_raw(&self) -> &ByteBuffer {
        self.auth_data.raw()
    }
}

fn missing(key: &str) -> WebauthnError {
    WebauthnError::Parse(format!("Attestation object is missing {key}"))
}

fn wrong_type(key: &str, expected: &str) -> WebauthnError {
    WebauthnError::Parse(format!("Attestation object {key} must be {expected}"))
}
