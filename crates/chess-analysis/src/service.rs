//! Review service: the two entry points callers use.
//!
//! [`ReviewService::analyze_position`] runs one search on a fresh engine.
//! [`ReviewService::analyze_game`] extracts the plies of a game, runs the
//! pipeline on one engine session and caches the finished report.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::analyzer::{AnalysisRequest, AnalysisResult};
use crate::board::{Board, BoardError};
use crate::cache::{CacheKey, ResultCache};
use crate::config::{AnalysisDefaults, ReviewConfig};
use crate::engine::EngineError;
use crate::extract::{extract, ExtractError};
use crate::pipeline::{analyze_plies, CancelFlag, GameOptions, GameReport};
use crate::pool::EnginePool;
use crate::provider::{AnalysisSession, EngineProvider};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("{0}")]
    InvalidFen(BoardError),
    #[error("No valid moves found in game notation")]
    NoValidMoves,
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(#[from] EngineError),
    #[error("Analysis cancelled")]
    Cancelled,
}

impl ReviewError {
    /// True when the caller's input was at fault, false when the engine was.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, ReviewError::InvalidFen(_) | ReviewError::NoValidMoves)
    }
}

impl From<ExtractError> for ReviewError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NoValidMoves => ReviewError::NoValidMoves,
            ExtractError::InvalidStartPosition(e) => ReviewError::InvalidFen(e),
        }
    }
}

pub struct ReviewService<P: EngineProvider> {
    provider: P,
    cache: Arc<ResultCache>,
    defaults: AnalysisDefaults,
}

impl ReviewService<EnginePool> {
    /// Service backed by real engine processes.
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(
            EnginePool::new(config.engine.clone()),
            Arc::new(ResultCache::new(config.analysis.cache_capacity)),
        )
        .with_defaults(config.analysis.clone())
    }
}

impl<P: EngineProvider> ReviewService<P> {
    pub fn new(provider: P, cache: Arc<ResultCache>) -> Self {
        Self {
            provider,
            cache,
            defaults: AnalysisDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: AnalysisDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Game options from the configured defaults, with caching on.
    pub fn default_game_options(&self) -> GameOptions {
        GameOptions {
            depth: self.defaults.depth,
            time_budget_ms: self.defaults.movetime_ms,
            cache_enabled: true,
        }
    }

    /// Analyses a single position.
    ///
    /// A search that runs out of time still returns its partial result.
    ///
    /// # Errors
    ///
    /// - [`ReviewError::InvalidFen`] before any engine is started
    /// - [`ReviewError::EngineUnavailable`] if the engine cannot be started or
    ///   fails during the search
    pub async fn analyze_position(
        &self,
        fen: &str,
        depth: u32,
        time_budget_ms: u64,
    ) -> Result<AnalysisResult, ReviewError> {
        let board = Board::from_fen(fen).map_err(ReviewError::InvalidFen)?;
        let request = AnalysisRequest::new(board.fen(), depth, time_budget_ms);

        let mut session = self.provider.acquire().await?;
        let outcome = session.analyze(&request).await;
        self.provider.release(session).await;

        let result = outcome?;
        debug!(
            fen = %request.fen,
            best = result.best_move.as_deref().unwrap_or("-"),
            depth = result.depth,
            completed = result.completed,
            "Position analysed"
        );
        Ok(result)
    }

    /// Reviews a whole game.
    pub async fn analyze_game(
        &self,
        notation: &str,
        options: &GameOptions,
    ) -> Result<Arc<GameReport>, ReviewError> {
        self.analyze_game_with_cancel(notation, options, &CancelFlag::new())
            .await
    }

    /// Reviews a whole game, giving up between plies once `cancel` is set.
    ///
    /// With `options.cache_enabled`, an identical earlier request (same
    /// notation up to whitespace, same depth and time budget) is answered from
    /// the cache without touching an engine.
    ///
    /// # Errors
    ///
    /// - [`ReviewError::NoValidMoves`] if no legal move could be read
    /// - [`ReviewError::InvalidFen`] if a `[FEN]` tag is unusable
    /// - [`ReviewError::EngineUnavailable`] if no engine could be started
    /// - [`ReviewError::Cancelled`] if `cancel` was set mid-run
    pub async fn analyze_game_with_cancel(
        &self,
        notation: &str,
        options: &GameOptions,
        cancel: &CancelFlag,
    ) -> Result<Arc<GameReport>, ReviewError> {
        let key = CacheKey::new(notation, options);
        if options.cache_enabled {
            if let Some(report) = self.cache.get(&key) {
                debug!(key = %key, "Serving game report from cache");
                return Ok(report);
            }
        }

        let game = extract(notation)?;
        info!(
            plies = game.len(),
            depth = options.depth,
            budget_ms = options.time_budget_ms,
            "Starting game analysis"
        );

        let mut session = self.provider.acquire().await?;
        let outcome = analyze_plies(&mut session, &game, options, cancel).await;
        self.provider.release(session).await;
        let records = outcome.map_err(|_| ReviewError::Cancelled)?;

        let report = Arc::new(GameReport::build(&game, records));
        info!(
            plies = report.moves.len(),
            analyzed = report.statistics.overall.analyzed,
            blunders = report.statistics.overall.blunders,
            "Game analysis finished"
        );

        if options.cache_enabled {
            self.cache.put(key, Arc::clone(&report));
        }
        Ok(report)
    }
}
