//! Sort order the authoring tool uses for the asset table.
//!
//! Characters are compared case-insensitively. ASCII punctuation sorts before
//! everything else, in the order given by a fixed table rather than by code
//! point. Two titles shipped with tables that differ only in where `.` and
//! `-` fall.

use serde::{Deserialize, Serialize};

/// Offset subtracted from a punctuation table index so that every
/// punctuation key is below every code point.
const PUNCTUATION_BIAS: i32 = 1000;

const LEGACY_PUNCTUATION: [char; 32] = [
    '_', '.', ',', ';', ':', '!', '?', '-', '\'', '"', '(', ')', '[', ']', '{', '}', '@', '*',
    '/', '\\', '&', '#', '%', '`', '^', '+', '<', '=', '>', '|', '~', '$',
];

const CURRENT_PUNCTUATION: [char; 32] = [
    '_', '-', ',', ';', ':', '!', '?', '.', '\'', '"', '(', ')', '[', ']', '{', '}', '@', '*',
    '/', '\\', '&', '#', '%', '`', '^', '+', '<', '=', '>', '|', '~', '$',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collation {
    Legacy,
    #[default]
    Current,
}

impl Collation {
    pub fn punctuation(&self) -> &'static [char; 32] {
        match *self {
            Self::Legacy => &LEGACY_PUNCTUATION,
            Self::Current => &CURRENT_PUNCTUATION,
        }
    }

    pub fn key(&self, s: &str) -> Vec<i32> {
        let table = self.punctuation();
        s.to_lowercase()
            .chars()
            .map(|c| match table.iter().position(|&p| p == c) {
                Some(index) => index as i32 - PUNCTUATION_BIAS,
                None => c as i32,
            })
            .collect()
    }

    /// Stable sort, so names with equal keys keep their incoming order.
    pub fn sort(&self, names: &mut [String]) {
        names.sort_by_cached_key(|name| self.key(name));
    }
}
