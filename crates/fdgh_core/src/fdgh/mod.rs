//! FDGH, the resource list telling the game which files to preload per room.
//!
//! Every offset in an FDGH file is absolute within the *wrapped* XBIN file,
//! so readers and writers are constructed with the container header length
//! as their base.
//!
//! ## Header (0x14 bytes)
//! ```text
//! [0x00] Magic "FDGH" (big endian) / "HGDF" (little endian)
//! [0x04] World map value          (u32, meaning unknown)
//! [0x08] World map offset         (u32)
//! [0x0C] Room table offset        (u32)
//! [0x10] Asset list offset        (u32)
//! ```
//!
//! ## World map
//! Count (u32) followed by that many room indices (u32).
//!
//! ## Room table
//! Count (u32) followed by one 0x0C-byte entry per room holding the offsets of
//! its name string, its link list (count + room indices) and its asset list
//! (count + asset indices). The bodies follow the table, room by room.
//!
//! ## Asset list
//! A string list (see [`crate::strings`]), sorted with the authoring tool's
//! collation, optionally carrying FNV-1a 64 hashes.

mod decode;
mod encode;

pub use decode::{Decoded, decode, decode_with_layout};
pub use encode::{EncodeOptions, encode};

use crate::endian::Endianness;

pub const FDGH_MAGIC_BIG: &[u8; 4] = b"FDGH";
pub const FDGH_MAGIC_LITTLE: &[u8; 4] = b"HGDF";
pub const HEADER_LEN: usize = 0x14;
pub(crate) const ROOM_ENTRY_LEN: usize = 0x0C;

pub fn magic(endianness: Endianness) -> &'static [u8; 4] {
    match endianness {
        Endianness::Big => FDGH_MAGIC_BIG,
        Endianness::Little => FDGH_MAGIC_LITTLE,
    }
}
