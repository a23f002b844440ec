use crate::buffer::{ByteBuffer, ByteBufferError};
use crate::errors::WebauthnError;

/// Read position over a TPM structure.
///
/// Readers consume the cursor and hand back the advanced one, so the order of
/// fields is an explicit data dependency of the parse.
#[derive(Debug, Clone, Copy)]
pub(super) struct Cursor<'a> {
    buffer: &'a ByteBuffer,
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(buffer: &'a ByteBuffer) -> Self {
        Self { buffer, offset: 0 }
    }

    pub(super) fn offset(&self) -> usize {
        self.offset
    }

    fn advance(self, size: usize) -> Self {
        Self {
            buffer: self.buffer,
            offset: self.offset + size,
        }
    }

    pub(super) fn read_u16(self) -> Result<(u16, Self), ByteBufferError> {
        let value = self.buffer.get_u16_be(self.offset)?;
        Ok((value, self.advance(2)))
    }

    pub(super) fn read_u32(self) -> Result<(u32, Self), ByteBufferError> {
        let value = self.buffer.get_u32_be(self.offset)?;
        Ok((value, self.advance(4)))
    }

    pub(super) fn read_fixed(self, size: usize) -> Result<(ByteBuffer, Self), ByteBufferError> {
        let value = self.buffer.get_bytes(self.offset, size)?;
        Ok((value, self.advance(size)))
    }

    pub(super) fn skip(self, size: usize) -> Result<Self, ByteBufferError> {
        self.buffer.get_slice(self.offset, size)?;
        Ok(self.advance(size))
    }

    /// Reads a TPM2B structure: a u16 size followed by that many bytes.
    pub(super) fn read_sized(self) -> Result<(ByteBuffer, Self), ByteBufferError> {
        let (size, cursor) = self.read_u16()?;
        cursor.read_fixed(usize::from(size))
    }

    pub(super) fn skip_sized(self) -> Result<Self, ByteBufferError> {
        let (size, cursor) = self.read_u16()?;
        cursor.skip(usize::from(size))
    }

    pub(super) fn finish(self, structure: &str) -> Result<(), WebauthnError> {
        let remaining = self.buffer.len().saturating_sub(self.offset());
        if remaining != 0 {
            return Err(WebauthnError::Parse(format!(
                "Unused bytes after {structure} at offset {}: {remaining} bytes remaining",
                self.offset()
            )));
        }
        Ok(())
    }
}
