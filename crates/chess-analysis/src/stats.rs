//! Game statistics, phase breakdown and key moments.

use crate::board::Side;
use crate::quality::{MoveQuality, MoveRecord};
use serde::{Deserialize, Serialize};

/// Most key moments reported per game.
pub const MAX_KEY_MOMENTS: usize = 10;
/// Upper bound on plies in the opening and middlegame phases.
pub const MAX_PHASE_PLIES: usize = 20;

/// Converts average centipawn loss to an accuracy percentage.
pub fn accuracy_from_acpl(acpl: f64) -> f64 {
    let accuracy = 103.1668 * (-0.04354 * (acpl / 10.0)).exp() - 3.1669;
    accuracy.clamp(0.0, 100.0)
}

/// Counts and averages over a set of moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    /// Every move, including unknown ones.
    pub total: u32,
    /// Moves with an engine verdict.
    pub analyzed: u32,
    pub excellent: u32,
    pub good: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    pub unknown: u32,
    /// `None` when no move was analysed.
    pub average_centipawn_loss: Option<f64>,
    pub accuracy_percent: Option<f64>,
}

impl SideStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MoveRecord>) -> Self {
        let mut stats = SideStats::default();
        let mut loss_sum = 0u64;

        for record in records {
            stats.total += 1;
            match record.quality {
                MoveQuality::Excellent => stats.excellent += 1,
                MoveQuality::Good => stats.good += 1,
                MoveQuality::Inaccuracy => stats.inaccuracies += 1,
                MoveQuality::Mistake => stats.mistakes += 1,
                MoveQuality::Blunder => stats.blunders += 1,
                MoveQuality::Unknown => {
                    stats.unknown += 1;
                    continue;
                }
            }
            stats.analyzed += 1;
            loss_sum += u64::from(record.centipawn_loss.unwrap_or(0));
        }

        if stats.analyzed > 0 {
            let acpl = loss_sum as f64 / f64::from(stats.analyzed);
            stats.average_centipawn_loss = Some(acpl);
            stats.accuracy_percent = Some(accuracy_from_acpl(acpl));
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub white: SideStats,
    pub black: SideStats,
    pub overall: SideStats,
}

impl GameStatistics {
    pub fn from_records(records: &[MoveRecord]) -> Self {
        Self {
            white: SideStats::from_records(records.iter().filter(|r| r.color == Side::White)),
            black: SideStats::from_records(records.iter().filter(|r| r.color == Side::Black)),
            overall: SideStats::from_records(records),
        }
    }
}

/// A contiguous run of plies, `start_ply..end_ply`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub start_ply: usize,
    pub end_ply: usize,
    pub move_count: usize,
    /// Mean per-move score over scored plies in the phase.
    pub average_score: Option<f64>,
}

impl PhaseSummary {
    fn over(records: &[MoveRecord], start_ply: usize, end_ply: usize) -> Self {
        let scores: Vec<f64> = records[start_ply..end_ply]
            .iter()
            .filter_map(|r| r.score)
            .collect();
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        Self {
            start_ply,
            end_ply,
            move_count: end_ply - start_ply,
            average_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseAnalysis {
    pub opening: PhaseSummary,
    pub middlegame: PhaseSummary,
    pub endgame: PhaseSummary,
}

impl PhaseAnalysis {
    /// Splits by ply index: the opening is the first 30% (at most 20 plies),
    /// the middlegame the next 40% (at most 20), the endgame the rest.
    pub fn from_records(records: &[MoveRecord]) -> Self {
        let total = records.len();
        let opening_end = (total * 3 / 10).min(MAX_PHASE_PLIES);
        let middlegame_end = opening_end + (total * 4 / 10).min(MAX_PHASE_PLIES);
        Self {
            opening: PhaseSummary::over(records, 0, opening_end),
            middlegame: PhaseSummary::over(records, opening_end, middlegame_end),
            endgame: PhaseSummary::over(records, middlegame_end, total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMomentKind {
    Blunder,
    BestMove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    pub ply: usize,
    pub color: Side,
    pub san: String,
    pub best_move: Option<String>,
    pub quality: MoveQuality,
    pub centipawn_loss: Option<u32>,
    pub kind: KeyMomentKind,
}

/// Blunders and top-scoring moves, in ply order, at most [`MAX_KEY_MOMENTS`].
pub fn key_moments(records: &[MoveRecord]) -> Vec<KeyMoment> {
    records
        .iter()
        .filter_map(|record| {
            let kind = if record.quality == MoveQuality::Blunder {
                KeyMomentKind::Blunder
            } else if record.quality == MoveQuality::Excellent && record.score == Some(100.0) {
                KeyMomentKind::BestMove
            } else {
                return None;
            };
            Some(KeyMoment {
                ply: record.ply,
                color: record.color,
                san: record.san.clone(),
                best_move: record.best_move.clone(),
                quality: record.quality,
                centipawn_loss: record.centipawn_loss,
                kind,
            })
        })
        .take(MAX_KEY_MOMENTS)
        .collect()
}
