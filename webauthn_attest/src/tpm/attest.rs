use crate::buffer::ByteBuffer;
use crate::errors::WebauthnError;

use super::cursor::Cursor;
use super::{TPM_GENERATED_VALUE, TPM_ST_ATTEST_CERTIFY};

// TPMS_CLOCK_INFO: clock(8) resetCount(4) restartCount(4) safe(1)
const CLOCK_INFO_LEN: usize = 17;
const FIRMWARE_VERSION_LEN: usize = 8;

/// Parsed TPMS_ATTEST of type TPM_ST_ATTEST_CERTIFY (the `certInfo` of a TPM
/// attestation statement). Only the fields the verifier needs are retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmAttest {
    raw: ByteBuffer,
    extra_data: ByteBuffer,
    attested_name: ByteBuffer,
}

impl TpmAttest {
    pub fn parse(buffer: &ByteBuffer) -> Result<Self, WebauthnError> {
        let cursor = Cursor::new(buffer);

        let (magic, cursor) = cursor.read_u32()?;
        if magic != TPM_GENERATED_VALUE {
            return Err(WebauthnError::Parse(format!(
                "Invalid TPMS_ATTEST magic: {magic:#010x}"
            )));
        }
        let (attest_type, cursor) = cursor.read_u16()?;
        if attest_type != TPM_ST_ATTEST_CERTIFY {
            return Err(WebauthnError::Parse(format!(
                "Invalid TPMS_ATTEST type: {attest_type:#06x}, expected TPM_ST_ATTEST_CERTIFY"
            )));
        }

        let cursor = cursor.skip_sized()?; // qualifiedSigner
        let (extra_data, cursor) = cursor.read_sized()?;
        let cursor = cursor.skip(CLOCK_INFO_LEN)?;
        let cursor = cursor.skip(FIRMWARE_VERSION_LEN)?;
        let (attested_name, cursor) = cursor.read_sized()?;
        let cursor = cursor.skip_sized()?; // attested qualifiedName
        cursor.finish("TPMS_ATTEST")?;

        Ok(Self {
            raw: buffer.clone(),
            extra_data,
            attested_name,
        })
    }

    pub fn raw(&self) -> &ByteBuffer {
        &self.raw
    }

    pub fn extra_data(&self) -> &ByteBuffer {
        &self.extra_data
    }

    pub fn attested_name(&self) -> &ByteBuffer {
        &self.attested_name
    }
}
