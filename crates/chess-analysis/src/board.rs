//! Board-state adapter over the `shakmaty` rules library.
//!
//! The rest of the crate only needs a handful of questions answered about a
//! position: apply a move token, report the side to move, report whether the
//! game is over, and print the position as FEN.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::Uci;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use std::fmt;
use thiserror::Error;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors from the board-state collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The FEN could not be parsed or describes an impossible position.
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    /// The token is not a legal move in the position.
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// The side that moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

/// A move that was applied, in both notations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    /// Standard algebraic notation with check/mate suffix, e.g. `Nf3`, `Qxf7#`.
    pub san: String,
    /// Coordinate notation as spoken over UCI, e.g. `g1f3`.
    pub uci: String,
}

/// A legal chess position.
#[derive(Debug, Clone)]
pub struct Board {
    position: Chess,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            position: Chess::default(),
        }
    }
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let invalid = |reason: String| BoardError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{}", e)))?;
        Ok(Self { position })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    pub fn side_to_move(&self) -> Side {
        self.position.turn().into()
    }

    /// Full move number as written in FEN.
    pub fn fullmove_number(&self) -> u32 {
        self.position.fullmoves().get()
    }

    pub fn is_game_over(&self) -> bool {
        self.position.is_game_over()
    }

    pub fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    /// Applies a move given in SAN (`Nf3`, `exd5`, `O-O`) or, failing that,
    /// UCI coordinate notation (`g1f3`).
    ///
    /// Returns the resulting board and the move in both notations.
    pub fn apply(&self, token: &str) -> Result<(Board, PlayedMove), BoardError> {
        let mv = self
            .parse_move(token)
            .ok_or_else(|| BoardError::IllegalMove(token.to_string()))?;

        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        let mut san = San::from_move(&self.position, &mv).to_string();

        let mut next = self.position.clone();
        next.play_unchecked(&mv);
        if next.is_checkmate() {
            san.push('#');
        } else if next.is_check() {
            san.push('+');
        }

        Ok((Board { position: next }, PlayedMove { san, uci }))
    }

    fn parse_move(&self, token: &str) -> Option<Move> {
        if let Ok(san) = token.parse::<SanPlus>() {
            if let Ok(mv) = san.san.to_move(&self.position) {
                return Some(mv);
            }
        }
        let uci: Uci = token.parse().ok()?;
        uci.to_move(&self.position).ok()
    }
}
