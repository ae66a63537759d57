//! Conversion between FDGH resource lists (wrapped in XBIN containers) and
//! editable XML.
//!
//! | Module | Concern |
//! |--------|---------|
//! | [`xbin`]    | XBIN container wrap/unwrap |
//! | [`fdgh`]    | FDGH payload decode/encode |
//! | [`strings`] | Length-prefixed strings and string lists |
//! | [`markup`]  | XML form of the document |
//! | [`convert`] | Whole-file pipelines |

pub mod collation;
pub mod config;
pub mod convert;
pub mod document;
pub mod endian;
pub mod error;
pub mod fdgh;
pub mod hash;
pub mod layout;
pub mod markup;
pub mod reader;
pub mod strings;
pub mod writer;
pub mod xbin;

pub use collation::Collation;
pub use config::XbinConfig;
pub use document::{DocumentSummary, FdghDocument, Room, WorldMap};
pub use endian::Endianness;
pub use error::{CodecError, ErrorCode, Result};
pub use fdgh::EncodeOptions;
pub use strings::{AssetHashes, StringPadding};
pub use xbin::XbinVersion;
