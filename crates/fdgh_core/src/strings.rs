//! Length-prefixed string bodies and the offset tables that index them.
//!
//! ## String body
//! ```text
//! [0x00] Length N            (u32)
//! [0x04] Latin-1 bytes       (N bytes)
//! [....] Null terminators    (4 legacy, 1 current)
//! [....] Zero padding to a multiple of 4
//! ```
//!
//! ## String list
//! ```text
//! [0x00] Count               (u32)
//! [0x04] Records             (Count × 4, or Count × 0x10 when hashed)
//! [....] String bodies
//! ```
//! A hashed record is `[zero u32][FNV-1a 64 of the bytes][offset u32]`. The
//! table start of a hashed list is aligned to 8 bytes so the hashes are too.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{CodecError, ErrorCode, Result};
use crate::hash::fnv1a64;
use crate::reader::OffsetReader;
use crate::writer::OffsetWriter;

const PLAIN_RECORD_LEN: usize = 4;
const HASHED_RECORD_LEN: usize = 16;
const HASHED_TABLE_ALIGNMENT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringPadding {
    /// Four null terminators, then alignment.
    #[default]
    Legacy,
    /// One null terminator, then alignment.
    Current,
}

impl StringPadding {
    pub fn terminator_count(&self) -> usize {
        match *self {
            Self::Legacy => 4,
            Self::Current => 1,
        }
    }

    pub fn from_terminator_count(count: u32) -> Option<Self> {
        match count {
            4 => Some(Self::Legacy),
            1 => Some(Self::Current),
            _ => None,
        }
    }

    /// Total encoded size of a string body holding `len` bytes.
    pub fn encoded_len(&self, len: usize) -> usize {
        (4 + len + self.terminator_count()).next_multiple_of(4)
    }

    /// Work out which convention produced a string body of `len` bytes that
    /// occupies `span` bytes before the next region. `None` when both or
    /// neither convention fit.
    pub fn infer(len: usize, span: usize) -> Option<Self> {
        let legacy = Self::Legacy.encoded_len(len) == span;
        let current = Self::Current.encoded_len(len) == span;
        match (legacy, current) {
            (true, false) => Some(Self::Legacy),
            (false, true) => Some(Self::Current),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssetHashes {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "fnv1a_64")]
    Fnv1a64,
}

impl AssetHashes {
    pub const FNV1A64_NAME: &'static str = "fnv1a_64";

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::FNV1A64_NAME => Some(Self::Fnv1a64),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::None => None,
            Self::Fnv1a64 => Some(Self::FNV1A64_NAME),
        }
    }

    pub fn is_active(&self) -> bool {
        *self != Self::None
    }

    /// Size of one string list record in this mode.
    pub fn record_len(&self) -> usize {
        match *self {
            Self::None => PLAIN_RECORD_LEN,
            Self::Fnv1a64 => HASHED_RECORD_LEN,
        }
    }
}

/// Decode Latin-1: every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub fn encode_latin1(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                CodecError::new(
                    ErrorCode::UnencodableString,
                    format!("character {c:?} in {s:?} is outside Latin-1"),
                )
            })
        })
        .collect()
}

pub fn read_string(r: &OffsetReader<'_>, offset: u32) -> Result<String> {
    let len = r.read_u32(offset, "string length")? as usize;
    let body_offset = offset.checked_add(4).ok_or_else(|| {
        CodecError::new(
            ErrorCode::TruncatedBuffer,
            format!("string at 0x{offset:x} overflows the offset range"),
        )
    })?;
    let bytes = r.read_bytes(body_offset, len, "string body")?;
    Ok(decode_latin1(bytes))
}

pub fn write_string(w: &mut OffsetWriter, s: &str, padding: StringPadding) -> Result<()> {
    let bytes = encode_latin1(s)?;
    let start = w.len();
    w.write_usize(bytes.len(), "string length")?;
    w.write_bytes(&bytes);
    w.write_bytes(&[0u8; 4][..padding.terminator_count()]);
    while (w.len() - start) % 4 != 0 {
        w.write_bytes(&[0]);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringList {
    pub strings: Vec<String>,
    /// Absolute offset of each string body, in table order.
    pub offsets: Vec<u32>,
    pub hashes: AssetHashes,
    /// Hashed records whose stored hash does not match their string.
    pub stale_hashes: usize,
}

/// Read a string list, detecting the hashed record layout from the four
/// bytes after the count. A plain table whose first offset is zero is
/// indistinguishable from a hashed one; real files never put a string at 0.
pub fn read_string_list(r: &OffsetReader<'_>, offset: u32) -> Result<StringList> {
    let count = r.read_u32(offset, "string list count")? as usize;
    let table = offset
        .checked_add(4)
        .ok_or_else(|| CodecError::truncated("string list", offset as usize, 4, r.len()))?;

    let hashes = if count > 0 && r.read_array::<4>(table, "string list record")? == [0; 4] {
        AssetHashes::Fnv1a64
    } else {
        AssetHashes::None
    };
    let record_len = hashes.record_len();
    let offset_field = record_len - 4;

    let records = r.read_bytes(table, count.saturating_mul(record_len), "string list records")?;
    let mut out = StringList {
        strings: Vec::with_capacity(count),
        offsets: Vec::with_capacity(count),
        hashes,
        stale_hashes: 0,
    };
    for record in records.chunks_exact(record_len) {
        let field = &record[offset_field..offset_field + 4];
        let string_offset = r
            .endianness()
            .u32_from([field[0], field[1], field[2], field[3]]);
        let string = read_string(r, string_offset)?;

        if hashes.is_active() {
            let mut stored = [0u8; 8];
            stored.copy_from_slice(&record[4..12]);
            let stored = r.endianness().u64_from(stored);
            let expected = fnv1a64(&encode_latin1(&string)?);
            if stored != expected {
                trace!(%string, stored, expected, "stored asset hash does not match");
                out.stale_hashes += 1;
            }
        }

        out.strings.push(string);
        out.offsets.push(string_offset);
    }

    trace!(count, hashed = hashes.is_active(), "read string list");
    Ok(out)
}

/// Write a string list and return the absolute offset of its count, which
/// for hashed lists comes after any alignment padding.
pub fn write_string_list(
    w: &mut OffsetWriter,
    strings: &[String],
    hashes: AssetHashes,
    padding: StringPadding,
) -> Result<usize> {
    if hashes.is_active() {
        w.align_to(HASHED_TABLE_ALIGNMENT);
    }
    let start = w.position();
    let record_len = hashes.record_len();

    w.write_usize(strings.len(), "string count")?;
    let mut bodies = OffsetWriter::new(
        w.endianness(),
        w.position() + strings.len() * record_len,
    );
    for s in strings {
        match hashes {
            AssetHashes::None => {}
            AssetHashes::Fnv1a64 => {
                w.write_u32(0);
                w.write_u64(fnv1a64(&encode_latin1(s)?));
            }
        }
        w.write_usize(bodies.position(), "string offset")?;
        write_string(&mut bodies, s, padding)?;
    }
    w.append(bodies);
    Ok(start)
}
