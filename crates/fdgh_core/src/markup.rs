//! XML form of an [`FdghDocument`].
//!
//! ```xml
//! <fdgh endian="little" xbin_version="4" num_string_null_terminators="1" asset_name_hashes="fnv1a_64">
//!   <worldmap value="2">
//!     <room>Level1</room>
//!   </worldmap>
//!   <rooms>
//!     <room name="Level1">
//!       <link>Level2</link>
//!       <asset>chara/Kirby</asset>
//!     </room>
//!   </rooms>
//! </fdgh>
//! ```
//!
//! Parsing checks well-formedness and attribute values only. Whether names
//! resolve is decided when the document is encoded.

use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::document::{DEFAULT_WORLD_MAP_VALUE, FdghDocument, Room, WorldMap};
use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode, Result};
use crate::strings::{AssetHashes, StringPadding};
use crate::xbin::XbinVersion;

pub const ROOT_TAG: &str = "fdgh";
const WORLD_MAP_TAG: &str = "worldmap";
const ROOMS_TAG: &str = "rooms";
const ROOM_TAG: &str = "room";
const LINK_TAG: &str = "link";
const ASSET_TAG: &str = "asset";

const ENDIAN_ATTR: &str = "endian";
const VERSION_ATTR: &str = "xbin_version";
const TERMINATORS_ATTR: &str = "num_string_null_terminators";
const HASHES_ATTR: &str = "asset_name_hashes";
const VALUE_ATTR: &str = "value";
const NAME_ATTR: &str = "name";

fn malformed(message: impl Display) -> CodecError {
    CodecError::new(ErrorCode::MalformedMarkup, message.to_string())
}

pub fn to_xml(doc: &FdghDocument) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(malformed)?;

    let version = doc.container_version.raw().to_string();
    let terminators = doc.string_padding.terminator_count().to_string();
    let mut root = BytesStart::new(ROOT_TAG);
    root.push_attribute((ENDIAN_ATTR, doc.endianness.as_str()));
    root.push_attribute((VERSION_ATTR, version.as_str()));
    root.push_attribute((TERMINATORS_ATTR, terminators.as_str()));
    if let Some(name) = doc.asset_hashes.name() {
        root.push_attribute((HASHES_ATTR, name));
    }
    w.write_event(Event::Start(root)).map_err(malformed)?;

    let comment = format!(
        " Generated by FDGH Converter {}. Room order matters: links and the world map refer to rooms by position in the binary file. ",
        env!("CARGO_PKG_VERSION")
    );
    w.write_event(Event::Comment(BytesText::from_escaped(comment)))
        .map_err(malformed)?;

    let value = doc.world_map.unknown_value.to_string();
    let mut world_map = BytesStart::new(WORLD_MAP_TAG);
    world_map.push_attribute((VALUE_ATTR, value.as_str()));
    if doc.world_map.room_sequence.is_empty() {
        w.write_event(Event::Empty(world_map)).map_err(malformed)?;
    } else {
        w.write_event(Event::Start(world_map)).map_err(malformed)?;
        for name in &doc.world_map.room_sequence {
            write_text_element(&mut w, ROOM_TAG, name)?;
        }
        w.write_event(Event::End(BytesEnd::new(WORLD_MAP_TAG)))
            .map_err(malformed)?;
    }

    if doc.rooms.is_empty() {
        w.write_event(Event::Empty(BytesStart::new(ROOMS_TAG)))
            .map_err(malformed)?;
    } else {
        w.write_event(Event::Start(BytesStart::new(ROOMS_TAG)))
            .map_err(malformed)?;
        for room in &doc.rooms {
            let mut start = BytesStart::new(ROOM_TAG);
            start.push_attribute((NAME_ATTR, room.name.as_str()));
            if room.links.is_empty() && room.asset_names.is_empty() {
                w.write_event(Event::Empty(start)).map_err(malformed)?;
                continue;
            }
            w.write_event(Event::Start(start)).map_err(malformed)?;
            for link in &room.links {
                write_text_element(&mut w, LINK_TAG, link)?;
            }
            for asset in &room.asset_names {
                write_text_element(&mut w, ASSET_TAG, asset)?;
            }
            w.write_event(Event::End(BytesEnd::new(ROOM_TAG)))
                .map_err(malformed)?;
        }
        w.write_event(Event::End(BytesEnd::new(ROOMS_TAG)))
            .map_err(malformed)?;
    }

    w.write_event(Event::End(BytesEnd::new(ROOT_TAG)))
        .map_err(malformed)?;

    let mut out = String::from_utf8(w.into_inner()).map_err(malformed)?;
    out.push('\n');
    Ok(out)
}

fn write_text_element(w: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(malformed)?;
    w.write_event(Event::Text(BytesText::new(text)))
        .map_err(malformed)?;
    w.write_event(Event::End(BytesEnd::new(tag)))
        .map_err(malformed)?;
    Ok(())
}

/// Minimal element tree; mixed content is flattened into `text`.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(malformed)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Self::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn reference(&self) -> String {
        self.text.trim().to_string()
    }
}

fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("XML error near byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an open element"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("element <{}> is never closed", open.name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(malformed("document has more than one root element"));
    }
    Ok(())
}

pub fn from_xml(xml: &str) -> Result<FdghDocument> {
    let root = parse_tree(xml)?;

    let endianness = match root.attr(ENDIAN_ATTR) {
        None => Endianness::Big,
        Some(raw) => Endianness::from_name(raw)
            .ok_or_else(|| malformed(format!("{ENDIAN_ATTR} must be big or little, got {raw:?}")))?,
    };
    let container_version = match root.attr(VERSION_ATTR) {
        None => XbinVersion::V2,
        Some(raw) => XbinVersion::parse(raw)?,
    };
    let asset_hashes = match root.attr(HASHES_ATTR) {
        None => AssetHashes::None,
        Some(raw) => AssetHashes::from_name(raw).ok_or_else(|| {
            CodecError::new(
                ErrorCode::UnsupportedHashMode,
                format!("unknown {HASHES_ATTR} value {raw:?}"),
            )
        })?,
    };
    let string_padding = match root.attr(TERMINATORS_ATTR) {
        None if asset_hashes.is_active() => StringPadding::Current,
        None => StringPadding::Legacy,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .and_then(StringPadding::from_terminator_count)
            .ok_or_else(|| malformed(format!("{TERMINATORS_ATTR} must be 1 or 4, got {raw:?}")))?,
    };

    let mut world_map = WorldMap::default();
    let mut rooms = Vec::new();
    for container in &root.children {
        match container.name.as_str() {
            WORLD_MAP_TAG => {
                world_map.unknown_value = match container.attr(VALUE_ATTR) {
                    None => DEFAULT_WORLD_MAP_VALUE,
                    Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                        malformed(format!("worldmap {VALUE_ATTR} {raw:?}: {e}"))
                    })?,
                };
                world_map.room_sequence.extend(
                    container
                        .children_named(ROOM_TAG)
                        .map(Element::reference),
                );
            }
            ROOMS_TAG => {
                for node in container.children_named(ROOM_TAG) {
                    let name = node
                        .attr(NAME_ATTR)
                        .ok_or_else(|| malformed("a <room> in <rooms> has no name attribute"))?;
                    rooms.push(Room {
                        name: name.to_string(),
                        links: node.children_named(LINK_TAG).map(Element::reference).collect(),
                        asset_names: node
                            .children_named(ASSET_TAG)
                            .map(Element::reference)
                            .collect(),
                    });
                }
            }
            _ => {}
        }
    }

    debug!(
        %endianness,
        version = container_version.raw(),
        rooms = rooms.len(),
        world_map_entries = world_map.room_sequence.len(),
        "parsed FDGH XML"
    );

    Ok(FdghDocument {
        endianness,
        container_version,
        string_padding,
        asset_hashes,
        world_map,
        rooms,
    })
}
