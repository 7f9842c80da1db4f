//! Engine-backed chess game review.
//!
//! This crate drives external UCI engines (Stockfish or compatible) to review
//! single positions and whole games: every played move gets a best-move
//! comparison, a centipawn loss and a quality class.
//!
//! # Overview
//!
//! - [`EnginePool`] - Starts one engine process per run and tears it down again
//! - [`analyze`] - Runs one UCI search with a deadline, returning partial results on timeout
//! - [`extract`] - Turns game notation into legal plies with before/after positions
//! - [`MoveQuality`] - Classification of move quality (Excellent, Good, ... Blunder)
//! - [`ResultCache`] - Bounded cache of finished game reports
//! - [`ReviewService`] - `analyze_position` and `analyze_game`
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{GameOptions, ReviewConfig, ReviewService};
//!
//! let config = ReviewConfig::load(None)?;
//! let service = ReviewService::from_config(&config);
//! let report = service.analyze_game("1. e4 e5 2. Nf3 Nc6 3. Bb5", &GameOptions::default()).await?;
//! println!("White accuracy: {:?}", report.statistics.white.accuracy_percent);
//! ```

pub mod analyzer;
pub mod board;
pub mod cache;
pub mod config;
pub mod engine;
pub mod evaluation;
pub mod extract;
pub mod metadata;
pub mod pipeline;
pub mod pool;
pub mod provider;
pub mod quality;
pub mod service;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use analyzer::{analyze, AnalysisRequest, AnalysisResult};
pub use board::{Board, BoardError, Side, START_FEN};
pub use cache::{CacheEntry, CacheKey, ResultCache};
pub use config::{AnalysisDefaults, ConfigError, EngineConfig, ReviewConfig};
pub use engine::{EngineError, EngineId, EngineProcess, EngineState};
pub use evaluation::Evaluation;
pub use extract::{extract, ExtractError, ExtractedGame, ExtractedPly};
pub use metadata::{read_metadata, GameMetadata};
pub use pipeline::{analyze_plies, CancelFlag, GameOptions, GameReport};
pub use pool::{EngineLease, EnginePool};
pub use provider::{AnalysisSession, EngineProvider};
pub use quality::{classify, MoveQuality, MoveRecord};
pub use service::{ReviewError, ReviewService};
pub use stats::{GameStatistics, KeyMoment, KeyMomentKind, PhaseAnalysis, PhaseSummary, SideStats};
