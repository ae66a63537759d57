use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};

/// Random-access reader over a buffer whose offsets are stored relative to an
/// enclosing file. `base` is subtracted from every absolute offset before it
/// indexes into `buf`.
#[derive(Debug, Clone, Copy)]
pub struct OffsetReader<'a> {
    buf: &'a [u8],
    endianness: Endianness,
    base: usize,
}

impl<'a> OffsetReader<'a> {
    pub fn new(buf: &'a [u8], endianness: Endianness, base: usize) -> Self {
        Self {
            buf,
            endianness,
            base,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Translate an absolute file offset into an index into the buffer.
    pub fn local(&self, offset: u32) -> Result<usize> {
        (offset as usize).checked_sub(self.base).ok_or_else(|| {
            CodecError::new(
                ErrorCode::TruncatedBuffer,
                format!(
                    "offset 0x{offset:x} points before the payload start 0x{:x}",
                    self.base
                ),
            )
        })
    }

    pub fn read_bytes(&self, offset: u32, len: usize, what: &str) -> Result<&'a [u8]> {
        let start = self.local(offset)?;
        start
            .checked_add(len)
            .and_then(|end| self.buf.get(start..end))
            .ok_or_else(|| CodecError::truncated(what, offset as usize, len, self.buf.len()))
    }

    pub fn read_array<const N: usize>(&self, offset: u32, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(offset, N, what)?);
        Ok(out)
    }

    pub fn read_u32(&self, offset: u32, what: &str) -> Result<u32> {
        Ok(self.endianness.u32_from(self.read_array(offset, what)?))
    }

    /// Read a u32 count followed by that many u32 values.
    pub fn read_counted_u32s(&self, offset: u32, what: &str) -> Result<Vec<u32>> {
        let count = self.read_u32(offset, what)? as usize;
        let body_offset = offset
            .checked_add(4)
            .ok_or_else(|| CodecError::truncated(what, offset as usize, 4, self.buf.len()))?;
        let body = self.read_bytes(body_offset, count.saturating_mul(4), what)?;
        Ok(body
            .chunks_exact(4)
            .map(|chunk| self.endianness.u32_from([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}
