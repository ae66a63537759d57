use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    InvalidMagic,
    UnsupportedVersion,
    MalformedHeader,
    TrailerMismatch,
    TruncatedBuffer,
    UnknownReference,
    UnsupportedHashMode,
    MalformedConfig,
    MalformedMarkup,
    DuplicateName,
    UnencodableString,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct CodecError {
    pub code: ErrorCode,
    pub message: String,
}

impl CodecError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn truncated(what: &str, offset: usize, len: usize, available: usize) -> Self {
        Self::new(
            ErrorCode::TruncatedBuffer,
            format!("{what} at 0x{offset:x} (+{len} bytes) runs past the end of a {available}-byte buffer"),
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
