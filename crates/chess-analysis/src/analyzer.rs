//! UCI search driver for a single position.
//!
//! [`analyze`] walks one [`EngineProcess`] through
//! `ucinewgame` / `isready` / `position fen` / `go depth movetime` and folds the
//! engine's `info` lines into an [`AnalysisResult`] until `bestmove` arrives or
//! the deadline (time budget plus the engine's response margin) passes. A
//! search that runs out of time still yields whatever was gathered so far.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

use crate::engine::{EngineError, EngineProcess, EngineState};
use crate::evaluation::Evaluation;

/// One search request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Position in FEN notation.
    pub fen: String,
    /// Depth ceiling passed as `go depth`.
    pub depth: u32,
    /// Time budget in milliseconds passed as `go movetime`.
    pub time_budget_ms: u64,
}

impl AnalysisRequest {
    pub fn new(fen: impl Into<String>, depth: u32, time_budget_ms: u64) -> Self {
        Self {
            fen: fen.into(),
            depth: depth.max(1),
            time_budget_ms: time_budget_ms.max(1),
        }
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

/// Result of analyzing a chess position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The best move found (in UCI notation, e.g., "e2e4"). `None` when the
    /// position has no legal moves or the search was cut off before any line.
    pub best_move: Option<String>,
    /// The position evaluation from the side to move's perspective.
    pub evaluation: Option<Evaluation>,
    /// The principal variation (sequence of best moves).
    pub pv: Vec<String>,
    /// The search depth reached.
    pub depth: u32,
    /// False when the deadline fired before the engine sent `bestmove`.
    pub completed: bool,
}

impl AnalysisResult {
    /// Folds one `info` line into the working result.
    ///
    /// Depth and evaluation move together and only from lines with an exact
    /// score; the principal variation is replaced by any line that carries one.
    /// Secondary `multipv` lines are ignored.
    pub fn absorb(&mut self, info: &EngineInfo) {
        if info.multipv.is_some_and(|n| n > 1) {
            return;
        }
        if info.has_exact_score() {
            if let (Some(depth), Some(score)) = (info.depth, info.score) {
                self.depth = depth;
                self.evaluation = Some(score.into());
            }
        }
        if !info.pv.is_empty() {
            self.pv = info.pv.clone();
        }
    }

    fn finish_partial(&mut self) {
        if self.best_move.is_none() {
            self.best_move = self.pv.first().cloned();
        }
    }
}

/// Analyse one position on an engine that is exclusively ours.
///
/// The whole call is bounded by the time budget plus the engine's response
/// margin. The last `stop_grace` of that window is reserved for `stop` and
/// the late `bestmove`, so a stuck engine cannot push the call past it.
///
/// # Errors
///
/// - [`EngineError::Communication`] if the process died or a stream closed
/// - [`EngineError::Unresponsive`] if the engine never synchronised, or a
///   previous search still has not delivered its `bestmove`
///
/// Running out of time is not an error: the partial result is returned with
/// `completed == false`.
pub async fn analyze(
    engine: &mut EngineProcess,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, EngineError> {
    let started = Instant::now();
    let window = request.time_budget() + engine.response_margin();
    let deadline = started + window;
    let search_deadline = started + window.saturating_sub(engine.stop_grace());

    if engine.state() == EngineState::Busy {
        drain_stale_search(engine, deadline).await?;
    }
    if engine.state() != EngineState::Ready {
        return Err(EngineError::InvalidTransition {
            from: engine.state(),
            to: EngineState::Busy,
        });
    }

    // Stays Ready until `go` is out: a missed readyok leaves nothing to drain,
    // and the stale readyok is consumed by the next call's sync.
    engine.send(&GuiCommand::UciNewGame).await?;
    engine.send(&GuiCommand::IsReady).await?;
    if !engine
        .wait_for(search_deadline, |m| *m == EngineMessage::ReadyOk)
        .await?
    {
        return Err(EngineError::Unresponsive(
            "no readyok before search".to_string(),
        ));
    }

    engine.send(&GuiCommand::position_fen(&request.fen)).await?;
    engine
        .send(&GuiCommand::Go(GoOptions::depth_and_movetime(
            request.depth,
            request.time_budget_ms,
        )))
        .await?;
    engine.transition(EngineState::Busy)?;

    let mut result = AnalysisResult::default();
    if collect_until_bestmove(engine, &mut result, search_deadline).await? {
        result.completed = true;
        engine.transition(EngineState::Ready)?;
        return Ok(result);
    }

    tracing::warn!(
        engine = %engine.id(),
        fen = %request.fen,
        budget_ms = request.time_budget_ms,
        depth = result.depth,
        "search deadline passed, returning partial result"
    );
    engine.send(&GuiCommand::Stop).await?;
    if collect_until_bestmove(engine, &mut result, deadline).await? {
        engine.transition(EngineState::Ready)?;
    }
    // Otherwise the engine stays Busy and the next call drains the late bestmove.
    result.finish_partial();
    Ok(result)
}

/// Reads lines into `result` until `bestmove`. Returns `false` on deadline.
async fn collect_until_bestmove(
    engine: &mut EngineProcess,
    result: &mut AnalysisResult,
    deadline: Instant,
) -> Result<bool, EngineError> {
    while let Some(message) = engine.read_message(deadline).await? {
        match message {
            EngineMessage::BestMove { mv, .. } => {
                if mv.is_some() || result.best_move.is_none() {
                    result.best_move = mv;
                }
                return Ok(true);
            }
            EngineMessage::Info(info) => result.absorb(&info),
            _ => {}
        }
    }
    Ok(false)
}

async fn drain_stale_search(
    engine: &mut EngineProcess,
    deadline: Instant,
) -> Result<(), EngineError> {
    engine.send(&GuiCommand::Stop).await?;
    let grace = (Instant::now() + engine.stop_grace()).min(deadline);
    if !engine.wait_for(grace, EngineMessage::is_bestmove).await? {
        return Err(EngineError::Unresponsive(
            "previous search never sent bestmove".to_string(),
        ));
    }
    engine.transition(EngineState::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uci::Score;

    fn info(line: &str) -> EngineInfo {
        EngineInfo::parse(line).unwrap()
    }

    #[test]
    fn test_request_clamps_zero_budgets() {
        let request = AnalysisRequest::new("8/8/8/8/8/8/8/K6k w - - 0 1", 0, 0);
        assert_eq!(request.depth, 1);
        assert_eq!(request.time_budget_ms, 1);
    }

    #[test]
    fn test_absorb_centipawn_line() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 15 score cp 35 nodes 50000 pv e2e4 e7e5 g1f3"));
        assert_eq!(result.depth, 15);
        assert_eq!(result.evaluation, Some(Evaluation::Centipawns(35)));
        assert_eq!(result.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_absorb_mate_line() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 12 score mate 3 nodes 10000 pv d1h5 g6h5"));
        assert_eq!(result.evaluation, Some(Evaluation::Mate(3)));
        assert_eq!(result.pv.len(), 2);
    }

    #[test]
    fn test_absorb_ignores_bounds_for_score_but_keeps_pv() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 10 score cp -150 nodes 25000 pv e7e5"));
        result.absorb(&info("info depth 11 score cp 90 upperbound pv d7d5 c2c4"));
        assert_eq!(result.depth, 10);
        assert_eq!(result.evaluation, Some(Evaluation::from(Score::Cp(-150))));
        assert_eq!(result.pv, vec!["d7d5", "c2c4"]);
    }

    #[test]
    fn test_absorb_ignores_lines_without_score() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 5 currmove e2e4 currmovenumber 1"));
        assert_eq!(result.depth, 0);
        assert!(result.evaluation.is_none());
        assert!(result.pv.is_empty());
    }

    #[test]
    fn test_absorb_ignores_secondary_multipv() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 8 multipv 1 score cp 20 pv e2e4"));
        result.absorb(&info("info depth 8 multipv 2 score cp 5 pv d2d4"));
        assert_eq!(result.evaluation, Some(Evaluation::Centipawns(20)));
        assert_eq!(result.pv, vec!["e2e4"]);
    }

    #[test]
    fn test_partial_result_takes_best_move_from_pv() {
        let mut result = AnalysisResult::default();
        result.absorb(&info("info depth 4 score cp 12 pv g1f3 d7d5"));
        result.finish_partial();
        assert_eq!(result.best_move.as_deref(), Some("g1f3"));
        assert!(!result.completed);
    }
}
