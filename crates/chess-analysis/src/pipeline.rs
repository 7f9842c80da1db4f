//! Move-by-move game analysis.
//!
//! One run holds one engine session and walks the plies in order: the
//! position before each move gets the full budget, the position after it a
//! halved one. A failed engine call marks that ply `Unknown` and the run goes
//! on with the same session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analyzer::{AnalysisRequest, AnalysisResult};
use crate::extract::{ExtractedGame, ExtractedPly};
use crate::metadata::GameMetadata;
use crate::provider::AnalysisSession;
use crate::quality::{classify, Classification, MoveRecord};
use crate::stats::{key_moments, GameStatistics, KeyMoment, PhaseAnalysis};

/// Options of one game review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    /// Depth ceiling for the position before each move.
    pub depth: u32,
    /// Time budget in milliseconds for the position before each move.
    pub time_budget_ms: u64,
    /// Serve and store results through the result cache.
    pub cache_enabled: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            depth: 18,
            time_budget_ms: 1000,
            cache_enabled: true,
        }
    }
}

impl GameOptions {
    /// Depth and time budget for the position after a move: both halved,
    /// never below 1.
    pub fn reduced(&self) -> (u32, u64) {
        ((self.depth / 2).max(1), (self.time_budget_ms / 2).max(1))
    }
}

/// Cooperative cancellation, checked between plies.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Analysis cancelled after {completed_plies} plies")]
pub struct Cancelled {
    pub completed_plies: usize,
}

/// Analyses every ply of `game` on `session`, in order.
///
/// Returns exactly one record per ply. Only cancellation aborts the run.
pub async fn analyze_plies<S: AnalysisSession>(
    session: &mut S,
    game: &ExtractedGame,
    options: &GameOptions,
    cancel: &CancelFlag,
) -> Result<Vec<MoveRecord>, Cancelled> {
    let (after_depth, after_budget_ms) = options.reduced();
    let mut records = Vec::with_capacity(game.plies.len());

    for ply in &game.plies {
        if cancel.is_cancelled() {
            info!(completed = records.len(), total = game.plies.len(), "Game analysis cancelled");
            return Err(Cancelled {
                completed_plies: records.len(),
            });
        }

        let before_request = AnalysisRequest::new(&ply.fen_before, options.depth, options.time_budget_ms);
        let before = match session.analyze(&before_request).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(ply = ply.ply, san = %ply.san, error = %e, "Engine failed on position before move");
                None
            }
        };

        let after = match before {
            Some(_) => {
                let after_request = AnalysisRequest::new(&ply.fen_after, after_depth, after_budget_ms);
                match session.analyze(&after_request).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!(ply = ply.ply, san = %ply.san, error = %e, "Engine failed on position after move");
                        None
                    }
                }
            }
            None => None,
        };

        let record = build_record(ply, before.as_ref(), after.as_ref());
        debug!(
            ply = record.ply,
            san = %record.san,
            best = record.best_move.as_deref().unwrap_or("-"),
            quality = %record.quality,
            loss = record.centipawn_loss,
            "Analysed ply"
        );
        records.push(record);
    }

    Ok(records)
}

fn build_record(
    ply: &ExtractedPly,
    before: Option<&AnalysisResult>,
    after: Option<&AnalysisResult>,
) -> MoveRecord {
    let best_move = before.and_then(|r| r.best_move.clone());
    let eval_before = before.and_then(|r| r.evaluation);
    let eval_after = after.and_then(|r| r.evaluation);

    let Classification {
        quality,
        centipawn_loss,
        score,
    } = classify(&ply.uci, best_move.as_deref(), eval_before, eval_after);

    MoveRecord {
        ply: ply.ply,
        color: ply.side,
        move_number: ply.move_number,
        san: ply.san.clone(),
        uci: ply.uci.clone(),
        fen_before: ply.fen_before.clone(),
        fen_after: ply.fen_after.clone(),
        best_move,
        eval_before,
        eval_after,
        quality,
        centipawn_loss,
        score,
    }
}

/// Full review of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub metadata: GameMetadata,
    pub statistics: GameStatistics,
    pub phases: PhaseAnalysis,
    pub key_moments: Vec<KeyMoment>,
    pub moves: Vec<MoveRecord>,
    /// Token at which move extraction stopped, if the notation held an illegal move.
    pub truncated_at: Option<String>,
}

impl GameReport {
    pub fn build(game: &ExtractedGame, moves: Vec<MoveRecord>) -> Self {
        Self {
            metadata: game.metadata.clone(),
            statistics: GameStatistics::from_records(&moves),
            phases: PhaseAnalysis::from_records(&moves),
            key_moments: key_moments(&moves),
            moves,
            truncated_at: game.truncated_at.clone(),
        }
    }
}
