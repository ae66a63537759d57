use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::endian::Endianness;
use crate::error::{CodecError, ErrorCode};
use crate::xbin::XbinVersion;

/// Everything besides the payload needed to rebuild an XBIN container,
/// written as `version,endianness,metadata` (for example `2,big,0xfde9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbinConfig {
    pub version: XbinVersion,
    pub endianness: Endianness,
    pub metadata: u32,
}

impl FromStr for XbinConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [version, endianness, metadata] = parts.as_slice() else {
            return Err(CodecError::new(
                ErrorCode::MalformedConfig,
                format!("expected \"version,endianness,metadata\", got {s:?}"),
            ));
        };

        let version = XbinVersion::parse(version)?;
        let endianness = Endianness::from_name(&endianness.to_ascii_lowercase()).ok_or_else(|| {
            CodecError::new(
                ErrorCode::MalformedConfig,
                format!("endianness must be \"big\" or \"little\", got {endianness:?}"),
            )
        })?;
        let metadata = parse_u32(metadata).ok_or_else(|| {
            CodecError::new(
                ErrorCode::MalformedConfig,
                format!("XBIN metadata must be an integer, got {metadata:?}"),
            )
        })?;

        Ok(Self {
            version,
            endianness,
            metadata,
        })
    }
}

impl fmt::Display for XbinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{:#x}",
            self.version.raw(),
            self.endianness,
            self.metadata
        )
    }
}

/// Integer with an optional `0x`, `0o` or `0b` radix prefix.
fn parse_u32(raw: &str) -> Option<u32> {
    let lower = raw.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shipped_configurations() {
        let config: XbinConfig = "2,big,0xfde9".parse().unwrap();
        assert_eq!(config.version, XbinVersion::V2);
        assert_eq!(config.endianness, Endianness::Big);
        assert_eq!(config.metadata, 0xFDE9);

        let config: XbinConfig = "4,LITTLE,932".parse().unwrap();
        assert_eq!(config.version, XbinVersion::V4);
        assert_eq!(config.endianness, Endianness::Little);
        assert_eq!(config.metadata, 0x3A4);
    }

    #[test]
    fn display_matches_parse_input() {
        let config: XbinConfig = "5,little,0x3a4".parse().unwrap();
        assert_eq!(config.to_string(), "5,little,0x3a4");
    }

    #[test]
    fn rejects_malformed_strings() {
        for raw in ["", "2,big", "2,big,1,2", "2,middle,1", "2,big,fde9", "2, big,1"] {
            let err = raw.parse::<XbinConfig>().unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedConfig, "{raw:?}");
        }
        let err = "3,big,1".parse::<XbinConfig>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedVersion);
    }
}
