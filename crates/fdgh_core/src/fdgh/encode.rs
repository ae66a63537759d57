use std::collections::HashMap;

use tracing::{debug, trace};

use crate::collation::Collation;
use crate::document::FdghDocument;
use crate::error::{CodecError, ErrorCode, Result};
use crate::strings::{write_string, write_string_list};
use crate::writer::OffsetWriter;

use super::{HEADER_LEN, ROOM_ENTRY_LEN, magic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    pub collation: Collation,
}

/// Encode a document into an FDGH payload, ready to be wrapped in an XBIN
/// container of the document's version.
///
/// Sections are appended in file order. The header goes out last, once the
/// offsets it records are known, and is prepended to the body.
pub fn encode(doc: &FdghDocument, options: &EncodeOptions) -> Result<Vec<u8>> {
    doc.validate()?;

    let room_indices: HashMap<&str, usize> = doc
        .rooms
        .iter()
        .enumerate()
        .map(|(i, room)| (room.name.as_str(), i))
        .collect();

    let mut assets = doc.asset_union();
    options.collation.sort(&mut assets);
    let asset_indices: HashMap<&str, usize> = assets
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let base = doc.container_version.header_len();
    let mut body = OffsetWriter::new(doc.endianness, base + HEADER_LEN);

    // World map
    let world_map_offset = body.position();
    body.write_usize(doc.world_map.room_sequence.len(), "world map count")?;
    for name in &doc.world_map.room_sequence {
        let index = lookup(&room_indices, name, "the world map")?;
        body.write_usize(index, "room index")?;
    }

    // Room table, then each room's name, links and assets
    let room_table_offset = body.position();
    body.write_usize(doc.rooms.len(), "room count")?;
    let mut room_data = OffsetWriter::new(
        doc.endianness,
        body.position() + doc.rooms.len() * ROOM_ENTRY_LEN,
    );
    for room in &doc.rooms {
        body.write_usize(room_data.position(), "room name offset")?;
        write_string(&mut room_data, &room.name, doc.string_padding)?;

        body.write_usize(room_data.position(), "room links offset")?;
        room_data.write_usize(room.links.len(), "link count")?;
        for link in &room.links {
            let index = room_indices.get(link.as_str()).copied().ok_or_else(|| {
                unknown_reference(link, &format!("the links of room {:?}", room.name))
            })?;
            room_data.write_usize(index, "room index")?;
        }

        body.write_usize(room_data.position(), "room assets offset")?;
        room_data.write_usize(room.asset_names.len(), "asset count")?;
        for asset in &room.asset_names {
            let index = lookup(&asset_indices, asset, "the asset table")?;
            room_data.write_usize(index, "asset index")?;
        }
        trace!(room = %room.name, "wrote room");
    }
    body.append(room_data);

    let asset_list_offset =
        write_string_list(&mut body, &assets, doc.asset_hashes, doc.string_padding)?;

    let mut out = OffsetWriter::new(doc.endianness, base);
    out.write_bytes(magic(doc.endianness));
    out.write_u32(doc.world_map.unknown_value);
    out.write_usize(world_map_offset, "world map offset")?;
    out.write_usize(room_table_offset, "room table offset")?;
    out.write_usize(asset_list_offset, "asset list offset")?;
    out.append(body);

    debug!(
        rooms = doc.rooms.len(),
        assets = assets.len(),
        hashed = doc.asset_hashes.is_active(),
        world_map_offset,
        room_table_offset,
        asset_list_offset,
        "encoded FDGH"
    );
    Ok(out.into_inner())
}

fn lookup(indices: &HashMap<&str, usize>, name: &str, context: &str) -> Result<usize> {
    indices
        .get(name)
        .copied()
        .ok_or_else(|| unknown_reference(name, context))
}

fn unknown_reference(name: &str, context: &str) -> CodecError {
    CodecError::new(
        ErrorCode::UnknownReference,
        format!("cannot find {name:?}, which is referenced in {context}"),
    )
}
