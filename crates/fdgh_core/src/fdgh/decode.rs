use tracing::{debug, trace};

use crate::document::{FdghDocument, Room, WorldMap};
use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};
use crate::layout::{ByteRange, FileLayout, SectionId};
use crate::reader::OffsetReader;
use crate::strings::{AssetHashes, StringPadding, read_string, read_string_list};
use crate::xbin::XbinVersion;

use super::{FDGH_MAGIC_BIG, FDGH_MAGIC_LITTLE, HEADER_LEN, ROOM_ENTRY_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub document: FdghDocument,
    pub layout: FileLayout,
}

struct RawRoom {
    name: String,
    name_offset: u32,
    links_offset: u32,
    links: Vec<u32>,
    assets_offset: u32,
    assets: Vec<u32>,
}

pub fn decode(payload: &[u8], version: XbinVersion) -> Result<FdghDocument> {
    decode_with_layout(payload, version).map(|decoded| decoded.document)
}

/// Decode an FDGH payload whose XBIN header has already been stripped.
pub fn decode_with_layout(payload: &[u8], version: XbinVersion) -> Result<Decoded> {
    if payload.len() < HEADER_LEN {
        return Err(CodecError::new(
            ErrorCode::TruncatedBuffer,
            format!("{} bytes is too short for an FDGH header", payload.len()),
        ));
    }
    let endianness = match &payload[..4] {
        m if m == FDGH_MAGIC_BIG => Endianness::Big,
        m if m == FDGH_MAGIC_LITTLE => Endianness::Little,
        _ => return Err(CodecError::new(ErrorCode::InvalidMagic, "missing FDGH magic")),
    };

    let base = version.header_len();
    let r = OffsetReader::new(payload, endianness, base);
    let header = offset_at(base, 0)?;
    let unknown_value = r.read_u32(offset_at(base, 0x04)?, "world map value")?;
    let world_map_offset = r.read_u32(offset_at(base, 0x08)?, "world map offset")?;
    let room_table_offset = r.read_u32(offset_at(base, 0x0C)?, "room table offset")?;
    let asset_list_offset = r.read_u32(offset_at(base, 0x10)?, "asset list offset")?;
    debug!(
        %endianness,
        world_map_offset,
        room_table_offset,
        asset_list_offset,
        "read FDGH header"
    );

    let world_map_indices = r.read_counted_u32s(world_map_offset, "world map")?;

    let room_count = r.read_u32(room_table_offset, "room count")? as usize;
    let mut raw_rooms = Vec::with_capacity(room_count.min(payload.len() / ROOM_ENTRY_LEN));
    let mut padding_votes = Vec::new();
    for i in 0..room_count {
        let entry = offset_at(room_table_offset as usize, 4 + ROOM_ENTRY_LEN * i)?;
        let name_offset = r.read_u32(entry, "room name offset")?;
        let links_offset = r.read_u32(offset_at(entry as usize, 4)?, "room links offset")?;
        let assets_offset = r.read_u32(offset_at(entry as usize, 8)?, "room assets offset")?;

        let name = read_string(&r, name_offset)?;
        if let Some(span) = links_offset.checked_sub(name_offset) {
            padding_votes.push((name.chars().count(), span as usize));
        }
        let links = r.read_counted_u32s(links_offset, "room links")?;
        let assets = r.read_counted_u32s(assets_offset, "room assets")?;
        trace!(room = %name, links = links.len(), assets = assets.len(), "read room");

        raw_rooms.push(RawRoom {
            name,
            name_offset,
            links_offset,
            links,
            assets_offset,
            assets,
        });
    }

    let asset_list = read_string_list(&r, asset_list_offset)?;
    for (i, pair) in asset_list.offsets.windows(2).enumerate() {
        if let Some(span) = pair[1].checked_sub(pair[0]) {
            padding_votes.push((asset_list.strings[i].chars().count(), span as usize));
        }
    }
    let string_padding = padding_votes
        .iter()
        .find_map(|&(len, span)| StringPadding::infer(len, span))
        .unwrap_or(match asset_list.hashes {
            AssetHashes::Fnv1a64 => StringPadding::Current,
            AssetHashes::None => StringPadding::Legacy,
        });
    debug!(
        rooms = raw_rooms.len(),
        assets = asset_list.strings.len(),
        hashed = asset_list.hashes.is_active(),
        terminators = string_padding.terminator_count(),
        "read FDGH sections"
    );

    let room_names: Vec<&str> = raw_rooms.iter().map(|room| room.name.as_str()).collect();
    let asset_names: Vec<&str> = asset_list.strings.iter().map(String::as_str).collect();
    let room_sequence = resolve(&world_map_indices, &room_names, "world map room")?;
    let rooms = raw_rooms
        .iter()
        .map(|raw| {
            Ok(Room {
                name: raw.name.clone(),
                links: resolve(&raw.links, &room_names, "linked room")?,
                asset_names: resolve(&raw.assets, &asset_names, "asset")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let string_end =
        |offset: u32, s: &str| offset as usize + string_padding.encoded_len(s.chars().count());
    let counted_end = |offset: u32, count: usize| offset as usize + 4 + 4 * count;

    let rooms_end = raw_rooms
        .iter()
        .flat_map(|raw| {
            [
                string_end(raw.name_offset, &raw.name),
                counted_end(raw.links_offset, raw.links.len()),
                counted_end(raw.assets_offset, raw.assets.len()),
            ]
        })
        .fold(
            room_table_offset as usize + 4 + ROOM_ENTRY_LEN * raw_rooms.len(),
            usize::max,
        );
    let assets_end = asset_list
        .offsets
        .iter()
        .zip(&asset_list.strings)
        .map(|(&offset, s)| string_end(offset, s))
        .fold(
            asset_list_offset as usize
                + 4
                + asset_list.hashes.record_len() * asset_list.strings.len(),
            usize::max,
        );

    let range = |start: u32, end: usize| ByteRange {
        start: start as usize,
        end,
    };
    let layout = FileLayout::from_ranges(
        &[
            (SectionId::Header, range(header, header as usize + HEADER_LEN)),
            (
                SectionId::WorldMap,
                range(
                    world_map_offset,
                    counted_end(world_map_offset, world_map_indices.len()),
                ),
            ),
            (SectionId::Rooms, range(room_table_offset, rooms_end)),
            (SectionId::Assets, range(asset_list_offset, assets_end)),
        ],
        base + payload.len(),
    );
    layout.validate()?;
    for gap in layout.gaps() {
        debug!(start = gap.start, end = gap.end, "unclaimed bytes between sections");
    }
    if asset_list.stale_hashes > 0 {
        debug!(
            count = asset_list.stale_hashes,
            "asset hashes do not match their names"
        );
    }

    Ok(Decoded {
        document: FdghDocument {
            endianness,
            container_version: version,
            string_padding,
            asset_hashes: asset_list.hashes,
            world_map: WorldMap {
                unknown_value,
                room_sequence,
            },
            rooms,
        },
        layout,
    })
}

fn offset_at(start: usize, delta: usize) -> Result<u32> {
    start
        .checked_add(delta)
        .and_then(|offset| u32::try_from(offset).ok())
        .ok_or_else(|| {
            CodecError::new(
                ErrorCode::TruncatedBuffer,
                format!("offset 0x{start:x} + 0x{delta:x} overflows the file"),
            )
        })
}

fn resolve(indices: &[u32], names: &[&str], what: &str) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|&index| {
            names
                .get(index as usize)
                .map(|name| name.to_string())
                .ok_or_else(|| {
                    CodecError::new(
                        ErrorCode::UnknownReference,
                        format!("{what} index {index} is out of range (have {})", names.len()),
                    )
                })
        })
        .collect()
}
