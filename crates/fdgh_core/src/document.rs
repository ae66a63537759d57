use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};
use crate::strings::{AssetHashes, StringPadding};
use crate::xbin::XbinVersion;

pub const DEFAULT_WORLD_MAP_VALUE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub links: Vec<String>,
    pub asset_names: Vec<String>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMap {
    pub unknown_value: u32,
    pub room_sequence: Vec<String>,
}

impl Default for WorldMap {
    fn default() -> Self {
        Self {
            unknown_value: DEFAULT_WORLD_MAP_VALUE,
            room_sequence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FdghDocument {
    pub endianness: Endianness,
    pub container_version: XbinVersion,
    pub string_padding: StringPadding,
    pub asset_hashes: AssetHashes,
    pub world_map: WorldMap,
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub endianness: Endianness,
    pub xbin_version: u8,
    pub num_string_null_terminators: usize,
    pub asset_name_hashes: Option<String>,
    pub world_map_value: u32,
    pub world_map_entries: usize,
    pub room_count: usize,
    pub link_count: usize,
    pub asset_reference_count: usize,
    pub distinct_asset_count: usize,
}

impl FdghDocument {
    pub fn room_index(&self, name: &str) -> Option<usize> {
        self.rooms.iter().position(|room| room.name == name)
    }

    /// First-seen union of every room's assets.
    pub fn asset_union(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in self.rooms.iter().flat_map(|room| &room.asset_names) {
            if seen.insert(name.as_str()) {
                out.push(name.clone());
            }
        }
        out
    }

    /// Check the invariants encoding depends on that are not about
    /// references: unique room names and a hash mode the padding supports.
    pub fn validate(&self) -> Result<()> {
        if self.asset_hashes.is_active() && self.string_padding != StringPadding::Current {
            return Err(CodecError::new(
                ErrorCode::UnsupportedHashMode,
                "asset name hashes require one string null terminator",
            ));
        }

        let mut names = HashSet::new();
        for room in &self.rooms {
            if !names.insert(room.name.as_str()) {
                return Err(CodecError::new(
                    ErrorCode::DuplicateName,
                    format!("room {:?} is defined more than once", room.name),
                ));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            endianness: self.endianness,
            xbin_version: self.container_version.raw(),
            num_string_null_terminators: self.string_padding.terminator_count(),
            asset_name_hashes: self.asset_hashes.name().map(str::to_string),
            world_map_value: self.world_map.unknown_value,
            world_map_entries: self.world_map.room_sequence.len(),
            room_count: self.rooms.len(),
            link_count: self.rooms.iter().map(|room| room.links.len()).sum(),
            asset_reference_count: self.rooms.iter().map(|room| room.asset_names.len()).sum(),
            distinct_asset_count: self.asset_union().len(),
        }
    }
}
