use std::fmt;

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors raised by bounds-checked reads on a [`ByteBuffer`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ByteBufferError {
    #[error("Read of {size} bytes at offset {offset} is out of range (length {length})")]
    OutOfRange {
        offset: usize,
        size: usize,
        length: usize,
    },
}

/// Immutable owned byte sequence with bounds-checked big-endian readers.
///
/// Every read validates `offset + size <= len()` before touching the data,
/// so malformed input surfaces as [`ByteBufferError::OutOfRange`] instead of
/// a panic or a truncated value. Equality is evaluated in constant time with
/// respect to the content of equally sized buffers.
#[derive(Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn check_range(&self, offset: usize, size: usize) -> Result<(), ByteBufferError> {
        match offset.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(ByteBufferError::OutOfRange {
                offset,
                size,
                length: self.data.len(),
            }),
        }
    }

    pub fn get_byte(&self, offset: usize) -> Result<u8, ByteBufferError> {
        self.check_range(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn get_u16_be(&self, offset: usize) -> Result<u16, ByteBufferError> {
        Ok(u16::from_be_bytes(self.fixed::<2>(offset)?))
    }

    pub fn get_u32_be(&self, offset: usize) -> Result<u32, ByteBufferError> {
        Ok(u32::from_be_bytes(self.fixed::<4>(offset)?))
    }

    pub fn get_u64_be(&self, offset: usize) -> Result<u64, ByteBufferError> {
        Ok(u64::from_be_bytes(self.fixed::<8>(offset)?))
    }

    /// Reads an IEEE 754 binary16 value and widens it to `f64`.
    pub fn get_half_float(&self, offset: usize) -> Result<f64, ByteBufferError> {
        let half = self.get_u16_be(offset)?;
        Ok(half_to_f64(half))
    }

    pub fn get_float(&self, offset: usize) -> Result<f32, ByteBufferError> {
        Ok(f32::from_be_bytes(self.fixed::<4>(offset)?))
    }

    pub fn get_double(&self, offset: usize) -> Result<f64, ByteBufferError> {
        Ok(f64::from_be_bytes(self.fixed::<8>(offset)?))
    }

    pub fn get_slice(&self, offset: usize, size: usize) -> Result<&[u8], ByteBufferError> {
        self.check_range(offset, size)?;
        Ok(&self.data[offset..offset + size])
    }

    /// Copies `size` bytes starting at `offset` into a new buffer.
    pub fn get_bytes(&self, offset: usize, size: usize) -> Result<ByteBuffer, ByteBufferError> {
        Ok(ByteBuffer::new(self.get_slice(offset, size)?))
    }

    pub fn concat(&self, other: &[u8]) -> ByteBuffer {
        let mut data = Vec::with_capacity(self.data.len() + other.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(other);
        ByteBuffer::new(data)
    }

    pub fn to_hex(&self) -> String {
        self.data.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn fixed<const N: usize>(&self, offset: usize) -> Result<[u8; N], ByteBufferError> {
        self.check_range(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[offset..offset + N]);
        Ok(out)
    }
}

// RFC 8949 Appendix D
fn half_to_f64(half: u16) -> f64 {
    let exponent = (half >> 10) & 0x1f;
    let mantissa = f64::from(half & 0x03ff);
    let value = match exponent {
        0 => mantissa * 2f64.powi(-24),
        31 if mantissa == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (mantissa + 1024.0) * 2f64.powi(i32::from(exponent) - 25),
    };
    if half & 0x8000 != 0 { -value } else { value }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.data.len() == other.data.len() && bool::from(self.data.ct_eq(&other.data))
    }
}

impl Eq for ByteBuffer {}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer({})", self.to_hex())
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl<const N: usize> From<[u8; N]> for ByteBuffer {
    fn from(data: [u8; N]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}
