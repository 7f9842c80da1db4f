//! PGN tag-pair reader.
//!
//! Header fields are informational only; nothing in the analysis math reads
//! them, apart from an optional `[FEN "..."]` start position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header fields of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    /// Declared result (`1-0`, `0-1`, `1/2-1/2`, `*`).
    pub result: Option<String>,
    /// Custom start position.
    pub fen: Option<String>,
    /// Every other tag, by name.
    pub other: BTreeMap<String, String>,
}

/// Reads the `[Name "Value"]` tag pairs at the top of `notation`.
///
/// Parsing stops at the first line that is neither blank nor a tag pair.
/// Malformed tag lines are skipped.
pub fn read_metadata(notation: &str) -> GameMetadata {
    let mut metadata = GameMetadata::default();

    for line in notation.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('[') {
            break;
        }
        let Some((name, value)) = parse_tag(line) else {
            continue;
        };
        let value = Some(value);
        match name.as_str() {
            "Event" => metadata.event = value,
            "Site" => metadata.site = value,
            "Date" => metadata.date = value,
            "Round" => metadata.round = value,
            "White" => metadata.white = value,
            "Black" => metadata.black = value,
            "Result" => metadata.result = value,
            "FEN" => metadata.fen = value,
            _ => {
                if let Some(value) = value {
                    metadata.other.insert(name, value);
                }
            }
        }
    }

    metadata
}

/// Parses `[Name "Value"]`, unescaping `\"` and `\\` in the value.
fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    let quoted = rest.trim().strip_prefix('"')?.strip_suffix('"')?;

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }

    Some((name.to_string(), value))
}
