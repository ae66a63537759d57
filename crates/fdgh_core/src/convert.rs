//! End-to-end conversions between XBIN-wrapped FDGH bytes and XML text.

use serde::Serialize;
use tracing::info;

use crate::document::{DocumentSummary, FdghDocument};
use crate::error::{CodecError, ErrorCode, Result};
use crate::fdgh::{self, EncodeOptions};
use crate::layout::{ByteRange, FileLayout};
use crate::markup;
use crate::xbin::{self, DEFAULT_METADATA};

/// A decoded binary file together with what the container told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub metadata: u32,
    pub document: FdghDocument,
    pub layout: FileLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionReport {
    pub metadata: u32,
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub layout: FileLayout,
    /// Bytes between or after sections that no section claims.
    pub gaps: Vec<ByteRange>,
}

impl Inspection {
    pub fn report(&self) -> InspectionReport {
        InspectionReport {
            metadata: self.metadata,
            summary: self.document.summary(),
            layout: self.layout.clone(),
            gaps: self.layout.gaps(),
        }
    }
}

pub fn inspect(bytes: &[u8]) -> Result<Inspection> {
    let unwrapped = xbin::unwrap(bytes)?;
    let decoded = fdgh::decode_with_layout(unwrapped.payload, unwrapped.version)?;
    if decoded.document.endianness != unwrapped.endianness {
        info!(
            container = %unwrapped.endianness,
            fdgh = %decoded.document.endianness,
            "XBIN and FDGH byte orders differ; using the FDGH one"
        );
    }
    Ok(Inspection {
        metadata: unwrapped.metadata,
        document: decoded.document,
        layout: decoded.layout,
    })
}

pub fn binary_to_document(bytes: &[u8]) -> Result<FdghDocument> {
    inspect(bytes).map(|inspection| inspection.document)
}

/// Encode a document and wrap it in the container its attributes describe.
pub fn document_to_binary(doc: &FdghDocument, options: &EncodeOptions) -> Result<Vec<u8>> {
    let payload = fdgh::encode(doc, options)?;
    xbin::wrap(
        doc.endianness,
        &payload,
        DEFAULT_METADATA,
        doc.container_version,
    )
}

pub fn binary_to_xml(bytes: &[u8]) -> Result<String> {
    markup::to_xml(&binary_to_document(bytes)?)
}

pub fn xml_to_binary(xml: &str, options: &EncodeOptions) -> Result<Vec<u8>> {
    document_to_binary(&markup::from_xml(xml)?, options)
}

/// Decode text that is expected to be UTF-8 XML, skipping a byte-order mark.
pub fn xml_from_bytes(bytes: &[u8]) -> Result<&str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).map_err(|e| {
        CodecError::new(
            ErrorCode::MalformedMarkup,
            format!("XML input is not valid UTF-8: {e}"),
        )
    })
}
