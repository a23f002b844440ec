use crate::buffer::ByteBuffer;
use crate::errors::WebauthnError;
use crate::utils::ct_eq;

use super::cursor::Cursor;
use super::{TPM_ALG_ECC, TPM_ALG_NULL, TPM_ALG_RSA, name_hash_algorithm};

/// Parsed TPMT_PUBLIC (the `pubArea` of a TPM attestation statement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmPublic {
    raw: ByteBuffer,
    object_type: u16,
    name_alg: u16,
    object_attributes: u32,
    parameters: TpmKeyParameters,
    unique: TpmUnique,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmKeyParameters {
    Rsa(RsaParameters),
    Ecc(EccParameters),
}

/// TPMS_RSA_PARMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaParameters {
    pub scheme: u16,
    pub scheme_hash: Option<u16>,
    pub key_bits: u16,
    /// Raw exponent field; zero selects the default 65537.
    pub exponent: u32,
}

impl RsaParameters {
    /// Effective public exponent as a minimal big-endian magnitude.
    pub fn exponent_bytes(&self) -> Vec<u8> {
        let exponent = if self.exponent == 0 { 65537 } else { self.exponent };
        let bytes = exponent.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        bytes[skip..].to_vec()
    }
}

/// TPMS_ECC_PARMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccParameters {
    pub scheme: u16,
    pub scheme_hash: Option<u16>,
    pub curve_id: u16,
    pub kdf: u16,
    pub kdf_hash: Option<u16>,
}

/// TPMU_PUBLIC_ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmUnique {
    Rsa { modulus: ByteBuffer },
    Ecc { x: ByteBuffer, y: ByteBuffer },
}

impl TpmPublic {
    pub fn parse(buffer: &ByteBuffer) -> Result<Self, WebauthnError> {
        let cursor = Cursor::new(buffer);
        let (object_type, cursor) = cursor.read_u16()?;
        let (name_alg, cursor) = cursor.read_u16()?;
        let (object_attributes, cursor) = cursor.read_u32()?;
        let cursor = cursor.skip_sized()?; // authPolicy

        let (parameters, cursor) = match object_type {
            TPM_ALG_RSA => {
                let (params, cursor) = parse_rsa_parameters(cursor)?;
                (TpmKeyParameters::Rsa(params), cursor)
            }
            TPM_ALG_ECC => {
                let (params, cursor) = parse_ecc_parameters(cursor)?;
                (TpmKeyParameters::Ecc(params), cursor)
            }
            other => {
                return Err(WebauthnError::Parse(format!(
                    "Unsupported TPM public area type: {other:#06x}"
                )));
            }
        };

        let (unique, cursor) = match parameters {
            TpmKeyParameters::Rsa(_) => {
                let (modulus, cursor) = cursor.read_sized()?;
                (TpmUnique::Rsa { modulus }, cursor)
            }
            TpmKeyParameters::Ecc(_) => {
                let (x, cursor) = cursor.read_sized()?;
                let (y, cursor) = cursor.read_sized()?;
                (TpmUnique::Ecc { x, y }, cursor)
            }
        };
        cursor.finish("TPMT_PUBLIC")?;

        Ok(Self {
            raw: buffer.clone(),
            object_type,
            name_alg,
            object_attributes,
            parameters,
            unique,
        })
    }

    pub fn raw(&self) -> &ByteBuffer {
        &self.raw
    }

    pub fn object_type(&self) -> u16 {
        self.object_type
    }

    pub fn name_alg(&self) -> u16 {
        self.name_alg
    }

    pub fn object_attributes(&self) -> u32 {
        self.object_attributes
    }

    pub fn parameters(&self) -> &TpmKeyParameters {
        &self.parameters
    }

    pub fn unique(&self) -> &TpmUnique {
        &self.unique
    }

    /// Checks that `name` is `nameAlg || H(pubArea)` for this structure.
    ///
    /// The algorithm tag is taken from the candidate itself and the digest
    /// comparison is constant time.
    pub fn is_valid_pub_info_name(&self, name: &ByteBuffer) -> Result<bool, WebauthnError> {
        let alg = name.get_u16_be(0)?;
        let hash = name_hash_algorithm(alg).ok_or_else(|| {
            WebauthnError::Unsupported(format!("TPM name algorithm {alg:#06x}"))
        })?;
        let mut expected = alg.to_be_bytes().to_vec();
        expected.extend_from_slice(&hash.digest(self.raw.as_slice()));
        Ok(ct_eq(&expected, name.as_slice()))
    }
}

fn read_symmetric(cursor: Cursor<'_>) -> Result<Cursor<'_>, WebauthnError> {
    let (symmetric, cursor) = cursor.read_u16()?;
    if symmetric != TPM_ALG_NULL {
        return Err(WebauthnError::Parse(format!(
            "TPM signing key must not have a symmetric algorithm, got {symmetric:#06x}"
        )));
    }
    Ok(cursor)
}

/// Reads a scheme selector and, when it is not TPM_ALG_NULL, its hash detail.
fn read_scheme(cursor: Cursor<'_>) -> Result<(u16, Option<u16>, Cursor<'_>), WebauthnError> {
    let (scheme, cursor) = cursor.read_u16()?;
    if scheme == TPM_ALG_NULL {
        return Ok((scheme, None, cursor));
    }
    let (hash, cursor) = cursor.read_u16()?;
    Ok((scheme, Some(hash), cursor))
}

fn parse_rsa_parameters(cursor: Cursor<'_>) -> Result<(RsaParameters, Cursor<'_>), WebauthnError> {
    let cursor = read_symmetric(cursor)?;
    let (scheme, scheme_hash, cursor) = read_scheme(cursor)?;
    let (key_bits, cursor) = cursor.read_u16()?;
    let (exponent, cursor) = cursor.read_u32()?;
    Ok((
        RsaParameters {
            scheme,
            scheme_hash,
            key_bits,
            exponent,
        },
        cursor,
    ))
}

fn parse_ecc_parameters(cursor: Cursor<'_>) -> Result<(EccParameters, Cursor<'_>), WebauthnError> {
    let cursor = read_symmetric(cursor)?;
    let (scheme, scheme_hash, cursor) = read_scheme(cursor)?;
    let (curve_id, cursor) = cursor.read_u16()?;
    let (kdf, kdf_hash, cursor) = read_scheme(cursor)?;
    Ok((
        EccParameters {
            scheme,
            scheme_hash,
            curve_id,
            kdf,
            kdf_hash,
        },
        cursor,
    ))
}
