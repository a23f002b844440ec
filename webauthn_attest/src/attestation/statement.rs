use crate::buffer::ByteBuffer;
use crate::cbor::{CborMap, CborMapKey, CborValue};
use crate::cose::CoseAlgorithm;
use crate::errors::WebauthnError;
use crate::pki::Certificate;
use crate::tpm::{TpmAttest, TpmPublic};

use super::types::AttestationFormat;

const ALG: &str = "alg";
const SIG: &str = "sig";
const X5C: &str = "x5c";
const ECDAA_KEY_ID: &str = "ecdaaKeyId";
const VER: &str = "ver";
const CERT_INFO: &str = "certInfo";
const PUB_AREA: &str = "pubArea";
const RESPONSE: &str = "response";

/// Which trust path a packed or TPM statement carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationPath {
    X5c(Vec<Certificate>),
    Ecdaa(ByteBuffer),
    SelfAttested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FidoU2fStatement {
    pub signature: ByteBuffer,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedStatement {
    pub algorithm: CoseAlgorithm,
    pub signature: ByteBuffer,
    pub path: AttestationPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmStatement {
    pub algorithm: CoseAlgorithm,
    pub signature: ByteBuffer,
    pub cert_info: TpmAttest,
    pub pub_area: TpmPublic,
    /// Never [`AttestationPath::SelfAttested`].
    pub path: AttestationPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidKeyStatement {
    pub algorithm: CoseAlgorithm,
    pub signature: ByteBuffer,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidSafetyNetStatement {
    pub version: String,
    /// Compact JWS returned by the SafetyNet attestation API.
    pub response: ByteBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleStatement {
    pub certificates: Vec<Certificate>,
}

/// An `attStmt` map validated against its format's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatement {
    None,
    FidoU2f(FidoU2fStatement),
    Packed(PackedStatement),
    Tpm(TpmStatement),
    AndroidKey(AndroidKeyStatement),
    AndroidSafetyNet(AndroidSafetyNetStatement),
    Apple(AppleStatement),
}

impl AttestationStatement {
    pub fn from_map(format: AttestationFormat, map: &CborMap) -> Result<Self, WebauthnError> {
        match format {
            AttestationFormat::None => {
                if !map.is_empty() {
                    return Err(schema_error(
                        format,
                        "expected an empty map for the none format",
                    ));
                }
                Ok(AttestationStatement::None)
            }
            AttestationFormat::FidoU2f => {
                let reader = SchemaReader::new(format, map, &[SIG, X5C])?;
                Ok(AttestationStatement::FidoU2f(FidoU2fStatement {
                    signature: reader.required_bytes(SIG)?,
                    certificates: reader.required_certificates()?,
                }))
            }
            AttestationFormat::Packed => {
                let reader = SchemaReader::new(format, map, &[ALG, SIG, X5C, ECDAA_KEY_ID])?;
                Ok(AttestationStatement::Packed(PackedStatement {
                    algorithm: reader.required_algorithm()?,
                    signature: reader.required_bytes(SIG)?,
                    path: reader.attestation_path()?,
                }))
            }
            AttestationFormat::Tpm => {
                let reader = SchemaReader::new(
                    format,
                    map,
                    &[VER, ALG, SIG, CERT_INFO, PUB_AREA, X5C, ECDAA_KEY_ID],
                )?;
                if reader.required_text(VER)? != "2.0" {
                    return Err(reader.error("only TPM version 2.0 is supported"));
                }
                let path = match reader.attestation_path()? {
                    AttestationPath::SelfAttested => {
                        return Err(reader.error("exactly one of x5c or ecdaaKeyId must be set"));
                    }
                    path => path,
                };
                let cert_info = TpmAttest::parse(&reader.required_bytes(CERT_INFO)?)
                    .map_err(|e| reader.error(&format!("certInfo: {e}")))?;
                let pub_area = TpmPublic::parse(&reader.required_bytes(PUB_AREA)?)
                    .map_err(|e| reader.error(&format!("pubArea: {e}")))?;
                Ok(AttestationStatement::Tpm(TpmStatement {
                    algorithm: reader.required_algorithm()?,
                    signature: reader.required_bytes(SIG)?,
                    cert_info,
                    pub_area,
                    path,
                }))
            }
            AttestationFormat::AndroidKey => {
                let reader = SchemaReader::new(format, map, &[ALG, SIG, X5C])?;
                Ok(AttestationStatement::AndroidKey(AndroidKeyStatement {
                    algorithm: reader.required_algorithm()?,
                    signature: reader.required_bytes(SIG)?,
                    certificates: reader.required_certificates()?,
                }))
            }
            AttestationFormat::AndroidSafetyNet => {
                let reader = SchemaReader::new(format, map, &[VER, RESPONSE])?;
                let version = reader.required_text(VER)?;
                if version.is_empty() {
                    return Err(reader.error("ver must not be empty"));
                }
                let response = reader.required_bytes(RESPONSE)?;
                if response.is_empty() {
                    return Err(reader.error("response must not be empty"));
                }
                Ok(AttestationStatement::AndroidSafetyNet(
                    AndroidSafetyNetStatement {
                        version: version.to_string(),
                        response,
                    },
                ))
            }
            AttestationFormat::Apple => {
                // Early iOS releases also sent alg; it carries no information.
                let reader = SchemaReader::new(format, map, &[X5C, ALG])?;
                Ok(AttestationStatement::Apple(AppleStatement {
                    certificates: reader.required_certificates()?,
                }))
            }
        }
    }

    pub fn format(&self) -> AttestationFormat {
        match self {
            AttestationStatement::None => AttestationFormat::None,
            AttestationStatement::FidoU2f(_) => AttestationFormat::FidoU2f,
            AttestationStatement::Packed(_) => AttestationFormat::Packed,
            AttestationStatement::Tpm(_) => AttestationFormat::Tpm,
            AttestationStatement::AndroidKey(_) => AttestationFormat::AndroidKey,
            AttestationStatement::AndroidSafetyNet(_) => AttestationFormat::AndroidSafetyNet,
            AttestationStatement::Apple(_) => AttestationFormat::Apple,
        }
    }
}

fn schema_error(format: AttestationFormat, detail: &str) -> WebauthnError {
    WebauthnError::Parse(format!("Invalid {format} attestation statement: {detail}"))
}

/// Typed access to an `attStmt` map restricted to a fixed set of keys.
struct SchemaReader<'a> {
    format: AttestationFormat,
    map: &'a CborMap,
}

impl<'a> SchemaReader<'a> {
    fn new(
        format: AttestationFormat,
        map: &'a CborMap,
        allowed: &[&str],
    ) -> Result<Self, WebauthnError> {
        for key in map.keys() {
            match key {
                CborMapKey::Text(name) if allowed.contains(&name.as_str()) => {}
                other => {
                    return Err(schema_error(format, &format!("unexpected key {other}")));
                }
            }
        }
        Ok(Self { format, map })
    }

    fn error(&self, detail: &str) -> WebauthnError {
        schema_error(self.format, detail)
    }

    fn get(&self, key: &str) -> Option<&'a CborValue> {
        self.map.get_text(key)
    }

    fn required(&self, key: &str) -> Result<&'a CborValue, WebauthnError> {
        self.get(key)
            .ok_or_else(|| self.error(&format!("missing {key}")))
    }

    fn required_bytes(&self, key: &str) -> Result<ByteBuffer, WebauthnError> {
        self.required(key)?
            .as_bytes()
            .cloned()
            .ok_or_else(|| self.error(&format!("{key} must be a byte string")))
    }

    fn optional_bytes(&self, key: &str) -> Result<Option<ByteBuffer>, WebauthnError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bytes()
                .cloned()
                .map(Some)
                .ok_or_else(|| self.error(&format!("{key} must be a byte string"))),
        }
    }

    fn required_text(&self, key: &str) -> Result<&'a str, WebauthnError> {
        self.required(key)?
            .as_text()
            .ok_or_else(|| self.error(&format!("{key} must be a text string")))
    }

    fn required_algorithm(&self) -> Result<CoseAlgorithm, WebauthnError> {
        let id = self
            .required(ALG)?
            .as_i64()
            .ok_or_else(|| self.error("alg must be an integer"))?;
        CoseAlgorithm::from_identifier(id)
            .ok_or_else(|| self.error(&format!("unsupported algorithm {id}")))
    }

    fn optional_certificates(&self) -> Result<Option<Vec<Certificate>>, WebauthnError> {
        let Some(value) = self.get(X5C) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.error("x5c must be an array"))?;
        if items.is_empty() {
            return Err(self.error("x5c must contain at least one certificate"));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let der = item
                    .as_bytes()
                    .ok_or_else(|| self.error(&format!("x5c[{i}] must be a byte string")))?;
                Certificate::from_der(der.to_vec())
                    .map_err(|e| self.error(&format!("x5c[{i}]: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn required_certificates(&self) -> Result<Vec<Certificate>, WebauthnError> {
        self.optional_certificates()?
            .ok_or_else(|| self.error("missing x5c"))
    }

    fn attestation_path(&self) -> Result<AttestationPath, WebauthnError> {
        match (self.optional_certificates()?, self.optional_bytes(ECDAA_KEY_ID)?) {
            (Some(_), Some(_)) => Err(self.error("x5c and ecdaaKeyId cannot both be set")),
            (Some(certificates), None) => Ok(AttestationPath::X5c(certificates)),
            (None, Some(key_id)) => Ok(AttestationPath::Ecdaa(key_id)),
            (None, None) => Ok(AttestationPath::SelfAttested),
        }
    }
}
