//! Chess position evaluation types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uci::Score;

/// Centipawn value a mate score is mapped to before comparing evaluations.
pub const MATE_SCORE: i32 = 10_000;

/// Represents a chess position evaluation.
///
/// Evaluations are always from the perspective of the side to move in the
/// analysed position: either a centipawn score or a mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better).
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, zero or negative = gets mated).
    Mate(i32),
}

impl Evaluation {
    /// Collapses the evaluation onto the centipawn scale, mapping mates to ±[`MATE_SCORE`].
    pub fn to_centipawns(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp,
            Evaluation::Mate(n) if n > 0 => MATE_SCORE,
            Evaluation::Mate(_) => -MATE_SCORE,
        }
    }

    /// The same evaluation seen from the opponent's side.
    pub fn negate(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(n) => Evaluation::Mate(-n),
        }
    }

    pub fn is_mate(self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }
}

impl From<Score> for Evaluation {
    fn from(score: Score) -> Self {
        match score {
            Score::Cp(cp) => Evaluation::Centipawns(cp),
            Score::Mate(n) => Evaluation::Mate(n),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Evaluation::Mate(n) => write!(f, "#{}", n),
        }
    }
}
