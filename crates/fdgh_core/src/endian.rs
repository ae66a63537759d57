use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "big" => Some(Self::Big),
            "little" => Some(Self::Little),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Big => "big",
            Self::Little => "little",
        }
    }

    pub fn u32_from(&self, bytes: [u8; 4]) -> u32 {
        match *self {
            Self::Big => u32::from_be_bytes(bytes),
            Self::Little => u32::from_le_bytes(bytes),
        }
    }

    pub fn u64_from(&self, bytes: [u8; 8]) -> u64 {
        match *self {
            Self::Big => u64::from_be_bytes(bytes),
            Self::Little => u64::from_le_bytes(bytes),
        }
    }

    pub fn u32_bytes(&self, value: u32) -> [u8; 4] {
        match *self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    pub fn u64_bytes(&self, value: u64) -> [u8; 8] {
        match *self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
