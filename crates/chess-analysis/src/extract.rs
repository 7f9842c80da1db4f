//! Game move extractor.
//!
//! Turns game notation text into the ordered list of legal plies, each with
//! the positions before and after the move.

use crate::board::{Board, BoardError, Side, START_FEN};
use crate::metadata::{read_metadata, GameMetadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Not a single token could be applied as a legal move.
    #[error("No valid moves found in game notation")]
    NoValidMoves,
    /// The `[FEN]` tag holds an unusable start position.
    #[error("Invalid start position: {0}")]
    InvalidStartPosition(#[from] BoardError),
}

/// One legal half-move of an extracted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPly {
    /// 0-based ply index.
    pub ply: usize,
    /// Side that made the move.
    pub side: Side,
    /// Full move number the ply belongs to.
    pub move_number: u32,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedGame {
    pub metadata: GameMetadata,
    pub initial_fen: String,
    pub plies: Vec<ExtractedPly>,
    /// The first token that could not be applied, if the game was cut short.
    pub truncated_at: Option<String>,
    pub final_fen: String,
}

impl ExtractedGame {
    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }
}

/// Extracts the legal plies from `notation`.
///
/// Tokens are replayed from the start position (or the `[FEN]` tag). The first
/// token that is not a legal move ends extraction; everything before it is
/// kept.
pub fn extract(notation: &str) -> Result<ExtractedGame, ExtractError> {
    let metadata = read_metadata(notation);
    let mut board = match metadata.fen.as_deref() {
        Some(fen) => Board::from_fen(fen)?,
        None => Board::default(),
    };
    let initial_fen = if metadata.fen.is_some() {
        board.fen()
    } else {
        START_FEN.to_string()
    };

    let mut plies = Vec::new();
    let mut truncated_at = None;

    for token in tokenize(&clean_notation(notation)) {
        let fen_before = board.fen();
        let side = board.side_to_move();
        let move_number = board.fullmove_number();

        match board.apply(&token) {
            Ok((next, played)) => {
                let fen_after = next.fen();
                debug!(ply = plies.len(), san = %played.san, uci = %played.uci, "Extracted ply");
                plies.push(ExtractedPly {
                    ply: plies.len(),
                    side,
                    move_number,
                    san: played.san,
                    uci: played.uci,
                    fen_before,
                    fen_after,
                });
                board = next;
            }
            Err(e) => {
                warn!(ply = plies.len(), token = %token, error = %e, "Stopping extraction at illegal move");
                truncated_at = Some(token);
                break;
            }
        }
    }

    if plies.is_empty() {
        return Err(ExtractError::NoValidMoves);
    }

    Ok(ExtractedGame {
        metadata,
        initial_fen,
        plies,
        truncated_at,
        final_fen: board.fen(),
    })
}

/// Removes tag-pair lines, `{...}` comments, `;` line comments, nested
/// `(...)` variations and `$n` annotation glyphs.
pub fn clean_notation(notation: &str) -> String {
    let mut out = String::with_capacity(notation.len());
    let mut brace_depth = 0usize;
    let mut paren_depth = 0usize;

    for line in notation.lines() {
        if brace_depth == 0 && paren_depth == 0 && line.trim_start().starts_with('[') {
            continue;
        }
        for ch in line.chars() {
            match ch {
                '{' if paren_depth == 0 => brace_depth += 1,
                '}' if paren_depth == 0 => brace_depth = brace_depth.saturating_sub(1),
                '(' if brace_depth == 0 => paren_depth += 1,
                ')' if brace_depth == 0 => paren_depth = paren_depth.saturating_sub(1),
                ';' if brace_depth == 0 && paren_depth == 0 => break,
                _ if brace_depth == 0 && paren_depth == 0 => out.push(ch),
                _ => {}
            }
        }
        out.push(' ');
    }

    out.split_whitespace()
        .filter(|token| !token.starts_with('$'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits cleaned movetext into move tokens.
///
/// Drops move numbers (`12.`, `12...`, and the prefix of `1.e4`), result
/// markers and `!`/`?` suffixes. Zero-based castling (`0-0`) is normalised to
/// `O-O`.
pub fn tokenize(movetext: &str) -> Vec<String> {
    movetext
        .split_whitespace()
        .filter(|token| !is_result_token(token))
        .map(strip_move_number)
        .map(|token| token.trim_end_matches(['!', '?']))
        .filter(|token| !token.is_empty())
        .map(normalize_castling)
        .collect()
}

fn is_result_token(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "½-½" | "*")
}

fn strip_move_number(token: &str) -> &str {
    let digits = token.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || !token[digits..].starts_with('.') {
        return token;
    }
    token[digits..].trim_start_matches('.')
}

fn normalize_castling(token: &str) -> String {
    let (body, suffix) = match token.find(['+', '#']) {
        Some(idx) => token.split_at(idx),
        None => (token, ""),
    };
    match body {
        "0-0" => format!("O-O{}", suffix),
        "0-0-0" => format!("O-O-O{}", suffix),
        _ => token.to_string(),
    }
}
