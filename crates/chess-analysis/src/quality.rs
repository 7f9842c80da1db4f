//! Move quality classification.

use crate::board::Side;
use crate::evaluation::Evaluation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive upper bound of centipawn loss for an excellent move.
pub const EXCELLENT_MAX_LOSS: u32 = 10;
/// Inclusive upper bound of centipawn loss for a good move.
pub const GOOD_MAX_LOSS: u32 = 25;
/// Inclusive upper bound of centipawn loss for an inaccuracy.
pub const INACCURACY_MAX_LOSS: u32 = 50;
/// Inclusive upper bound of centipawn loss for a mistake. Anything above is a blunder.
pub const MISTAKE_MAX_LOSS: u32 = 100;

/// Classification of move quality based on evaluation loss.
///
/// Ordered from worst to best, so `Excellent > Good > ... > Blunder`.
/// `Unknown` (no engine verdict) sorts below everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    /// Engine analysis failed for this ply.
    Unknown,
    /// Major centipawn loss
    Blunder,
    /// Significant centipawn loss
    Mistake,
    /// Noticeable centipawn loss
    Inaccuracy,
    /// Small centipawn loss
    Good,
    /// Best move or minimal centipawn loss
    Excellent,
}

impl MoveQuality {
    pub fn from_cp_loss(loss: u32) -> Self {
        if loss <= EXCELLENT_MAX_LOSS {
            MoveQuality::Excellent
        } else if loss <= GOOD_MAX_LOSS {
            MoveQuality::Good
        } else if loss <= INACCURACY_MAX_LOSS {
            MoveQuality::Inaccuracy
        } else if loss <= MISTAKE_MAX_LOSS {
            MoveQuality::Mistake
        } else {
            MoveQuality::Blunder
        }
    }

    pub fn is_known(self) -> bool {
        self != MoveQuality::Unknown
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveQuality::Unknown => "unknown",
            MoveQuality::Blunder => "blunder",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Good => "good",
            MoveQuality::Excellent => "excellent",
        };
        f.write_str(name)
    }
}

/// Loss attributed to a move, from two side-to-move evaluations.
///
/// `before` is from the mover's perspective, `after` from the opponent's, so
/// the mover's view of the resulting position is `-after`. Mate scores count
/// as ±10000.
pub fn centipawn_loss(before: Evaluation, after: Evaluation) -> u32 {
    let before = i64::from(before.to_centipawns());
    let after_for_mover = -i64::from(after.to_centipawns());
    let loss = (before - after_for_mover).unsigned_abs();
    u32::try_from(loss).unwrap_or(u32::MAX)
}

/// Per-move score in `0.0..=100.0`, linear inside each quality band.
pub fn quality_score(loss: u32, best_move_played: bool) -> f64 {
    if best_move_played {
        return 100.0;
    }
    let band = MoveQuality::from_cp_loss(loss);
    let loss = f64::from(loss);
    let score = match band {
        MoveQuality::Excellent => 100.0 - loss,
        MoveQuality::Good => 90.0 - (loss - 10.0),
        MoveQuality::Inaccuracy => 75.0 - (loss - 25.0),
        MoveQuality::Mistake => 50.0 - (loss - 50.0) / 2.0,
        _ => 25.0 - (loss - 100.0) / 8.0,
    };
    score.clamp(0.0, 100.0)
}

/// Verdict on one played move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub quality: MoveQuality,
    pub centipawn_loss: Option<u32>,
    pub score: Option<f64>,
}

impl Classification {
    pub const UNKNOWN: Classification = Classification {
        quality: MoveQuality::Unknown,
        centipawn_loss: None,
        score: None,
    };
}

/// Classifies a played move.
///
/// Both evaluations are required; without them the move is `Unknown`.
/// Playing the engine's best move is excellent whatever the measured loss.
pub fn classify(
    played_uci: &str,
    best_move: Option<&str>,
    eval_before: Option<Evaluation>,
    eval_after: Option<Evaluation>,
) -> Classification {
    let (Some(before), Some(after)) = (eval_before, eval_after) else {
        return Classification::UNKNOWN;
    };

    let loss = centipawn_loss(before, after);
    let best_move_played = best_move.is_some_and(|best| best == played_uci);
    let quality = if best_move_played {
        MoveQuality::Excellent
    } else {
        MoveQuality::from_cp_loss(loss)
    };

    Classification {
        quality,
        centipawn_loss: Some(loss),
        score: Some(quality_score(loss, best_move_played)),
    }
}

/// Everything known about one ply of a reviewed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 0-based ply index.
    pub ply: usize,
    /// Side that made the move.
    pub color: Side,
    pub move_number: u32,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    /// Engine's preferred move in the position before, in UCI notation.
    pub best_move: Option<String>,
    pub eval_before: Option<Evaluation>,
    pub eval_after: Option<Evaluation>,
    pub quality: MoveQuality,
    pub centipawn_loss: Option<u32>,
    pub score: Option<f64>,
}

impl MoveRecord {
    pub fn is_best_move(&self) -> bool {
        self.best_move.as_deref() == Some(self.uci.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundaries_are_inclusive() {
        assert_eq!(MoveQuality::from_cp_loss(0), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_cp_loss(10), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_cp_loss(11), MoveQuality::Good);
        assert_eq!(MoveQuality::from_cp_loss(25), MoveQuality::Good);
        assert_eq!(MoveQuality::from_cp_loss(26), MoveQuality::Inaccuracy);
        assert_eq!(MoveQuality::from_cp_loss(50), MoveQuality::Inaccuracy);
        assert_eq!(MoveQuality::from_cp_loss(51), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_cp_loss(100), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_cp_loss(101), MoveQuality::Blunder);
        assert_eq!(MoveQuality::from_cp_loss(150), MoveQuality::Blunder);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(MoveQuality::Excellent > MoveQuality::Good);
        assert!(MoveQuality::Good > MoveQuality::Inaccuracy);
        assert!(MoveQuality::Inaccuracy > MoveQuality::Mistake);
        assert!(MoveQuality::Mistake > MoveQuality::Blunder);
        assert!(MoveQuality::Blunder > MoveQuality::Unknown);
    }

    #[test]
    fn test_centipawn_loss_uses_negated_after() {
        // +30 for the mover, opponent then sees -30: nothing lost.
        assert_eq!(
            centipawn_loss(Evaluation::Centipawns(30), Evaluation::Centipawns(-30)),
            0
        );
        // +30 before, opponent sees +120 after.
        assert_eq!(
            centipawn_loss(Evaluation::Centipawns(30), Evaluation::Centipawns(120)),
            150
        );
        assert_eq!(
            centipawn_loss(Evaluation::Centipawns(0), Evaluation::Mate(2)),
            10_000
        );
        assert_eq!(
            centipawn_loss(Evaluation::Mate(3), Evaluation::Mate(-2)),
            0
        );
    }

    #[test]
    fn test_best_move_is_excellent() {
        let verdict = classify(
            "e2e4",
            Some("e2e4"),
            Some(Evaluation::Centipawns(30)),
            Some(Evaluation::Centipawns(-30)),
        );
        assert_eq!(verdict.quality, MoveQuality::Excellent);
        assert_eq!(verdict.centipawn_loss, Some(0));
        assert_eq!(verdict.score, Some(100.0));

        // Best move stays excellent even when the shallower follow-up disagrees.
        let verdict = classify(
            "e2e4",
            Some("e2e4"),
            Some(Evaluation::Centipawns(30)),
            Some(Evaluation::Centipawns(40)),
        );
        assert_eq!(verdict.quality, MoveQuality::Excellent);
        assert_eq!(verdict.centipawn_loss, Some(70));
    }

    #[test]
    fn test_loss_of_150_is_blunder() {
        let verdict = classify(
            "g8f6",
            Some("d7d5"),
            Some(Evaluation::Centipawns(-20)),
            Some(Evaluation::Centipawns(170)),
        );
        assert_eq!(verdict.centipawn_loss, Some(150));
        assert_eq!(verdict.quality, MoveQuality::Blunder);
    }

    #[test]
    fn test_missing_evaluation_is_unknown() {
        assert_eq!(
            classify("e2e4", Some("e2e4"), None, Some(Evaluation::Centipawns(0))),
            Classification::UNKNOWN
        );
        assert_eq!(
            classify("e2e4", None, Some(Evaluation::Centipawns(0)), None),
            Classification::UNKNOWN
        );
    }

    #[test]
    fn test_quality_score_bands() {
        assert_eq!(quality_score(0, false), 100.0);
        assert_eq!(quality_score(10, false), 90.0);
        assert_eq!(quality_score(25, false), 75.0);
        assert_eq!(quality_score(50, false), 50.0);
        assert_eq!(quality_score(100, false), 25.0);
        assert_eq!(quality_score(300, false), 0.0);
        assert_eq!(quality_score(300, true), 100.0);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&MoveQuality::Inaccuracy).unwrap(),
            "\"inaccuracy\""
        );
        assert_eq!(MoveQuality::Blunder.to_string(), "blunder");
    }

    proptest! {
        #[test]
        fn prop_more_loss_never_better(a in 0u32..20_000, b in 0u32..20_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(MoveQuality::from_cp_loss(low) >= MoveQuality::from_cp_loss(high));
            prop_assert!(quality_score(low, false) >= quality_score(high, false));
        }

        #[test]
        fn prop_score_in_range(loss in any::<u32>()) {
            let score = quality_score(loss, false);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn prop_known_evals_give_known_quality(before in -2_000i32..2_000, after in -2_000i32..2_000) {
            let verdict = classify(
                "a2a3",
                Some("h2h3"),
                Some(Evaluation::Centipawns(before)),
                Some(Evaluation::Centipawns(after)),
            );
            prop_assert!(verdict.quality.is_known());
            prop_assert_eq!(verdict.quality, MoveQuality::from_cp_loss(verdict.centipawn_loss.unwrap()));
        }
    }
}
