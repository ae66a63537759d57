//! XBIN, the thin container wrapped around FDGH and other engine files.
//!
//! ## Header
//! ```text
//! [0x00] Magic "XBIN"          (4 bytes)
//! [0x04] Byte-order mark       (12 34 = big, 34 12 = little)
//! [0x06] Version               (u8: 2, 4 or 5)
//! [0x07] Reserved, always 0    (u8)
//! [0x08] Total size            (u32)
//! [0x0C] Metadata              (u32, opaque; 0xFDE9 or 0x3A4 in shipped files)
//! [0x10] Trailer offset        (u32, versions 4 and 5 only)
//! ```
//!
//! Versions 4 and 5 pad the payload to 4 bytes and end with a 12-byte
//! trailer: `COLR` (big endian) or `RLOC` (little endian) and 8 zero bytes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};
use crate::reader::OffsetReader;

pub const XBIN_MAGIC: &[u8; 4] = b"XBIN";
pub const BOM_BIG: [u8; 2] = [0x12, 0x34];
pub const BOM_LITTLE: [u8; 2] = [0x34, 0x12];
pub const TRAILER_TAG_BIG: &[u8; 4] = b"COLR";
pub const TRAILER_TAG_LITTLE: &[u8; 4] = b"RLOC";
pub const TRAILER_LEN: usize = 12;

/// Metadata word written when there is no existing container to copy it from.
pub const DEFAULT_METADATA: u32 = 0xFDE9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum XbinVersion {
    #[default]
    V2,
    V4,
    V5,
}

impl XbinVersion {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            2 => Some(Self::V2),
            4 => Some(Self::V4),
            5 => Some(Self::V5),
            _ => None,
        }
    }

    pub fn raw(&self) -> u8 {
        match *self {
            Self::V2 => 2,
            Self::V4 => 4,
            Self::V5 => 5,
        }
    }

    pub fn header_len(&self) -> usize {
        match *self {
            Self::V2 => 0x10,
            Self::V4 | Self::V5 => 0x14,
        }
    }

    pub fn has_trailer(&self) -> bool {
        !matches!(self, Self::V2)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        raw.parse::<u8>()
            .ok()
            .and_then(Self::from_raw)
            .ok_or_else(|| {
                CodecError::new(
                    ErrorCode::UnsupportedVersion,
                    format!("XBIN version must be 2, 4 or 5, got {raw:?}"),
                )
            })
    }
}

pub fn trailer(endianness: Endianness) -> [u8; TRAILER_LEN] {
    let tag = match endianness {
        Endianness::Big => TRAILER_TAG_BIG,
        Endianness::Little => TRAILER_TAG_LITTLE,
    };
    let mut out = [0u8; TRAILER_LEN];
    out[..4].copy_from_slice(tag);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unwrapped<'a> {
    pub endianness: Endianness,
    pub payload: &'a [u8],
    pub metadata: u32,
    pub version: XbinVersion,
}

pub fn unwrap(data: &[u8]) -> Result<Unwrapped<'_>> {
    if data.len() < 0x10 {
        return Err(CodecError::new(
            ErrorCode::TruncatedBuffer,
            format!("{} bytes is too short for an XBIN header", data.len()),
        ));
    }

    if &data[..4] != XBIN_MAGIC {
        return Err(CodecError::new(ErrorCode::InvalidMagic, "missing XBIN magic"));
    }
    let endianness = match [data[4], data[5]] {
        BOM_BIG => Endianness::Big,
        BOM_LITTLE => Endianness::Little,
        other => {
            return Err(CodecError::new(
                ErrorCode::InvalidMagic,
                format!("unknown XBIN byte-order mark {:02x}{:02x}", other[0], other[1]),
            ));
        }
    };

    let version = XbinVersion::from_raw(data[6]).ok_or_else(|| {
        CodecError::new(
            ErrorCode::UnsupportedVersion,
            format!("unknown XBIN version {}", data[6]),
        )
    })?;
    if data[7] != 0 {
        return Err(CodecError::new(
            ErrorCode::MalformedHeader,
            format!("XBIN reserved byte is {} (expected 0)", data[7]),
        ));
    }

    let header_len = version.header_len();
    let r = OffsetReader::new(data, endianness, 0);
    let total_size = r.read_u32(0x08, "XBIN total size")? as usize;
    let metadata = r.read_u32(0x0C, "XBIN metadata")?;

    if total_size < header_len || total_size > data.len() {
        return Err(CodecError::new(
            ErrorCode::TruncatedBuffer,
            format!(
                "XBIN total size 0x{total_size:x} is outside 0x{header_len:x}..=0x{:x}",
                data.len()
            ),
        ));
    }

    if version.has_trailer() {
        let trailer_offset = r.read_u32(0x10, "XBIN trailer offset")? as usize;
        if trailer_offset != total_size.next_multiple_of(4) {
            return Err(CodecError::new(
                ErrorCode::MalformedHeader,
                format!(
                    "XBIN trailer offset 0x{trailer_offset:x} does not follow total size 0x{total_size:x}"
                ),
            ));
        }
        let found = r.read_bytes(trailer_offset as u32, TRAILER_LEN, "XBIN trailer")?;
        if found != trailer(endianness) {
            return Err(CodecError::new(
                ErrorCode::TrailerMismatch,
                format!("unexpected XBIN trailer {found:02x?}"),
            ));
        }
    }

    debug!(
        version = version.raw(),
        %endianness,
        metadata,
        payload_len = total_size - header_len,
        "unwrapped XBIN"
    );

    Ok(Unwrapped {
        endianness,
        payload: &data[header_len..total_size],
        metadata,
        version,
    })
}

pub fn wrap(
    endianness: Endianness,
    payload: &[u8],
    metadata: u32,
    version: XbinVersion,
) -> Result<Vec<u8>> {
    let header_len = version.header_len();
    let padded_len = if version.has_trailer() {
        payload.len().next_multiple_of(4)
    } else {
        payload.len()
    };
    let total_size = u32::try_from(header_len + padded_len).map_err(|_| {
        CodecError::new(
            ErrorCode::MalformedHeader,
            format!("payload of {} bytes is too large for XBIN", payload.len()),
        )
    })?;

    let mut out = Vec::with_capacity(header_len + padded_len + TRAILER_LEN);
    out.extend_from_slice(XBIN_MAGIC);
    out.extend_from_slice(match endianness {
        Endianness::Big => &BOM_BIG,
        Endianness::Little => &BOM_LITTLE,
    });
    out.push(version.raw());
    out.push(0);
    out.extend_from_slice(&endianness.u32_bytes(total_size));
    out.extend_from_slice(&endianness.u32_bytes(metadata));
    if version.has_trailer() {
        out.extend_from_slice(&endianness.u32_bytes(total_size));
    }
    out.extend_from_slice(payload);
    out.resize(header_len + padded_len, 0);
    if version.has_trailer() {
        out.extend_from_slice(&trailer(endianness));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_two_has_sixteen_byte_header_and_no_trailer() {
        let out = wrap(Endianness::Big, &[1, 2, 3], 0xFDE9, XbinVersion::V2).unwrap();
        assert_eq!(
            out,
            vec![
                b'X', b'B', b'I', b'N', 0x12, 0x34, 2, 0, 0, 0, 0, 0x13, 0, 0, 0xFD, 0xE9, 1, 2,
                3
            ]
        );
    }

    #[test]
    fn version_four_pads_and_appends_trailer() {
        let out = wrap(Endianness::Little, &[9; 6], 0x3A4, XbinVersion::V4).unwrap();
        assert_eq!(out.len(), 0x14 + 8 + TRAILER_LEN);
        assert_eq!(&out[4..6], &BOM_LITTLE);
        assert_eq!(&out[8..12], &0x1Cu32.to_le_bytes());
        assert_eq!(&out[16..20], &0x1Cu32.to_le_bytes());
        assert_eq!(&out[0x1A..0x1C], &[0, 0]);
        assert_eq!(&out[0x1C..0x20], b"RLOC");
    }

    #[test]
    fn rejects_bad_magic_and_bom() {
        let mut data = wrap(Endianness::Big, &[], 0, XbinVersion::V2).unwrap();
        data[4] = 0;
        assert_eq!(unwrap(&data).unwrap_err().code, ErrorCode::InvalidMagic);
        data[0] = b'Y';
        assert_eq!(unwrap(&data).unwrap_err().code, ErrorCode::InvalidMagic);
    }

    #[test]
    fn rejects_unknown_version_and_reserved_byte() {
        let mut data = wrap(Endianness::Big, &[], 0, XbinVersion::V2).unwrap();
        data[6] = 3;
        assert_eq!(unwrap(&data).unwrap_err().code, ErrorCode::UnsupportedVersion);
        data[6] = 2;
        data[7] = 1;
        assert_eq!(unwrap(&data).unwrap_err().code, ErrorCode::MalformedHeader);
    }

    #[test]
    fn rejects_wrong_trailer_and_trailer_offset() {
        let good = wrap(Endianness::Big, &[0; 4], 0, XbinVersion::V5).unwrap();

        let mut bad_tag = good.clone();
        let last = bad_tag.len() - 1;
        bad_tag[last] = 1;
        assert_eq!(unwrap(&bad_tag).unwrap_err().code, ErrorCode::TrailerMismatch);

        let mut bad_offset = good.clone();
        bad_offset[0x13] += 4;
        assert_eq!(
            unwrap(&bad_offset).unwrap_err().code,
            ErrorCode::MalformedHeader
        );

        let truncated = &good[..good.len() - 4];
        assert_eq!(unwrap(truncated).unwrap_err().code, ErrorCode::TruncatedBuffer);
    }

    #[test]
    fn rejects_total_size_past_end() {
        let mut data = wrap(Endianness::Big, &[0; 4], 0, XbinVersion::V2).unwrap();
        data[0x0B] = 0x40;
        assert_eq!(unwrap(&data).unwrap_err().code, ErrorCode::TruncatedBuffer);
        assert_eq!(unwrap(&data[..8]).unwrap_err().code, ErrorCode::TruncatedBuffer);
    }
}
