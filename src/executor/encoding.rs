//! Text decoding for captured output
//!
//! Decoding here is for display only and never fails: bytes that do not
//! decode are dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoding used when presenting captured bytes as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    #[serde(alias = "iso-8859-1", alias = "latin-1")]
    Latin1,
    Ascii,
}

impl Encoding {
    /// Decode `bytes`, dropping anything undecodable, and trim trailing whitespace.
    pub fn decode_lossy(self, bytes: &[u8]) -> String {
        let mut text = match self {
            Encoding::Utf8 => bytes
                .utf8_chunks()
                .map(|chunk| chunk.valid())
                .collect::<String>(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Ascii => bytes
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect(),
        };
        text.truncate(text.trim_end().len());
        text
    }

    /// Decode `bytes` exactly, or `None` if any byte is undecodable.
    pub fn decode_strict(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Encoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Utf8 => "utf8",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
        };
        f.write_str(name)
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Encoding::Latin1),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            other => Err(format!("unsupported encoding '{}'", other)),
        }
    }
}
