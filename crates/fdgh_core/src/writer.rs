use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};

/// Append-only output buffer that knows the absolute file offset of its next
/// byte. Regions are always appended before anything needs to point at them
/// again, so nothing already written is ever patched.
#[derive(Debug, Clone)]
pub struct OffsetWriter {
    buf: Vec<u8>,
    endianness: Endianness,
    base: usize,
}

impl OffsetWriter {
    pub fn new(endianness: Endianness, base: usize) -> Self {
        Self {
            buf: Vec::new(),
            endianness,
            base,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Absolute offset of the next byte to be written.
    pub fn position(&self) -> usize {
        self.base + self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        let bytes = self.endianness.u32_bytes(value);
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_u64(&mut self, value: u64) {
        let bytes = self.endianness.u64_bytes(value);
        self.buf.extend_from_slice(&bytes);
    }

    /// Write an offset, count or index that must fit in a u32 field.
    pub fn write_usize(&mut self, value: usize, what: &str) -> Result<()> {
        let value = u32::try_from(value).map_err(|_| {
            CodecError::new(
                ErrorCode::MalformedHeader,
                format!("{what} {value} does not fit in a 32-bit field"),
            )
        })?;
        self.write_u32(value);
        Ok(())
    }

    /// Zero-fill until the absolute position is a multiple of `alignment`.
    pub fn align_to(&mut self, alignment: usize) {
        while self.position() % alignment != 0 {
            self.buf.push(0);
        }
    }

    /// Append a writer that was started at this writer's current position.
    pub fn append(&mut self, other: OffsetWriter) {
        debug_assert_eq!(other.base, self.position());
        self.buf.extend_from_slice(&other.buf);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_includes_base() {
        let mut w = OffsetWriter::new(Endianness::Little, 0x14);
        assert_eq!(w.position(), 0x14);
        w.write_u32(1);
        assert_eq!(w.position(), 0x18);
        assert_eq!(w.into_inner(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn aligns_on_absolute_offsets() {
        let mut w = OffsetWriter::new(Endianness::Big, 0x14);
        w.align_to(8);
        assert_eq!(w.position(), 0x18);
        assert_eq!(w.len(), 4);
        w.align_to(8);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn appended_region_keeps_offsets() {
        let mut w = OffsetWriter::new(Endianness::Big, 0x10);
        w.write_u32(0xAABBCCDD);
        let mut tail = OffsetWriter::new(Endianness::Big, w.position());
        tail.write_u32(2);
        w.append(tail);
        assert_eq!(w.into_inner(), vec![0xAA, 0xBB, 0xCC, 0xDD, 0, 0, 0, 2]);
    }
}
