use crate::buffer::ByteBuffer;
use crate::cbor::{self, CborValue};
use crate::cose::CoseKey;
use crate::errors::WebauthnError;

use super::types::Aaguid;

/// Flags for AuthenticatorData as defined in WebAuthn Level 3
pub mod flags {
    /// User Present (UP) - Bit 0
    pub const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub const BS: u8 = 1 << 4;
    /// Attested Credential Data Present - Bit 6
    pub const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub const ED: u8 = 1 << 7;
}

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_LEN: usize = 16;
const MAX_CREDENTIAL_ID_LEN: usize = 1023;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    aaguid: Aaguid,
    credential_id: ByteBuffer,
    credential_public_key: CoseKey,
}

impl AttestedCredentialData {
    pub fn aaguid(&self) -> Aaguid {
        self.aaguid
    }

    pub fn credential_id(&self) -> &ByteBuffer {
        &self.credential_id
    }

    pub fn credential_public_key(&self) -> &CoseKey {
        &self.credential_public_key
    }
}

/// Parsed view over raw authenticator data.
///
/// Layout: `rpIdHash(32) || flags(1) || signCount(4, BE) ||
/// [attestedCredentialData] || [extensions]`. The AT and ED flags must agree
/// with the presence of the optional parts and every byte must be consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    raw: ByteBuffer,
    rp_id_hash: [u8; RP_ID_HASH_LEN],
    flags: u8,
    sign_count: u32,
    attested_credential_data: Option<AttestedCredentialData>,
    extensions: Option<CborValue>,
}

impl AuthenticatorData {
    pub fn parse(raw: ByteBuffer) -> Result<Self, WebauthnError> {
        if raw.len() < HEADER_LEN {
            return Err(WebauthnError::Parse(format!(
                "Authenticator data too short: {} bytes",
                raw.len()
            )));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(raw.get_slice(0, RP_ID_HASH_LEN)?);
        let flags = raw.get_byte(RP_ID_HASH_LEN)?;
        let sign_count = raw.get_u32_be(RP_ID_HASH_LEN + 1)?;

        if flags & flags::BS != 0 && flags & flags::BE == 0 {
            return Err(WebauthnError::Parse(
                "Backup state flag set on a credential that is not backup eligible".to_string(),
            ));
        }

        let mut offset = HEADER_LEN;

        let attested_credential_data = if flags & flags::AT != 0 {
            let (data, end) = parse_attested_credential_data(&raw, offset)?;
            offset = end;
            Some(data)
        } else {
            None
        };

        let extensions = if flags & flags::ED != 0 {
            let (value, end) = cbor::decode_in_place(&raw, offset)?;
            if value.as_map().is_none() {
                return Err(WebauthnError::Parse(format!(
                    "Authenticator extensions must be a map, got {}",
                    value.type_name()
                )));
            }
            offset = end;
            Some(value)
        } else {
            None
        };

        if offset != raw.len() {
            return Err(WebauthnError::Parse(format!(
                "Unused bytes in authenticator data: {} bytes remaining (flags {flags:#04x})",
                raw.len() - offset
            )));
        }

        Ok(Self {
            raw,
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }

    pub fn raw(&self) -> &ByteBuffer {
        &self.raw
    }

    pub fn rp_id_hash(&self) -> &[u8; RP_ID_HASH_LEN] {
        &self.rp_id_hash
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_count
    }

    pub fn attested_credential_data(&self) -> Option<&AttestedCredentialData> {
        self.attested_credential_data.as_ref()
    }

    pub fn extensions(&self) -> Option<&CborValue> {
        self.extensions.as_ref()
    }

    /// Check if user was present during the ceremony
    pub fn is_user_present(&self) -> bool {
        (self.flags & flags::UP) != 0
    }

    /// Check if user was verified by the authenticator
    pub fn is_user_verified(&self) -> bool {
        (self.flags & flags::UV) != 0
    }

    pub fn is_backup_eligible(&self) -> bool {
        (self.flags & flags::BE) != 0
    }

    pub fn is_backed_up(&self) -> bool {
        (self.flags & flags::BS) != 0
    }

    pub fn has_attested_credential_data(&self) -> bool {
        (self.flags & flags::AT) != 0
    }

    pub fn has_extension_data(&self) -> bool {
        (self.flags & flags::ED) != 0
    }
}

fn parse_attested_credential_data(
    raw: &ByteBuffer,
    offset: usize,
) -> Result<(AttestedCredentialData, usize), WebauthnError> {
    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(raw.get_slice(offset, AAGUID_LEN)?);
    let offset = offset + AAGUID_LEN;

    let id_len = usize::from(raw.get_u16_be(offset)?);
    if id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(WebauthnError::Parse(format!(
            "Credential ID too long: {id_len} bytes"
        )));
    }
    let offset = offset + 2;
    let credential_id = raw.get_bytes(offset, id_len)?;
    let offset = offset + id_len;

    let (credential_public_key, offset) = CoseKey::parse_in_place(raw, offset)?;

    Ok((
        AttestedCredentialData {
            aaguid: Aaguid::new(aaguid),
            credential_id,
            credential_public_key,
        },
        offset,
    ))
}
