//! JSON documents printed on stdout.

use chess_analysis::{AnalysisResult, GameOptions, GameReport};
use chrono::Utc;
use serde::Serialize;

/// Result of the `position` command.
#[derive(Serialize)]
pub struct PositionJson<'a> {
    pub fen: &'a str,
    pub depth: u32,
    pub movetime_ms: u64,
    /// Evaluation rendered for people, e.g. `+0.35` or `#-2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_text: Option<String>,
    pub analysis: &'a AnalysisResult,
    /// ISO 8601 timestamp when the document was created.
    pub created_at: String,
}

impl<'a> PositionJson<'a> {
    pub fn new(fen: &'a str, depth: u32, movetime_ms: u64, analysis: &'a AnalysisResult) -> Self {
        Self {
            fen,
            depth,
            movetime_ms,
            evaluation_text: analysis.evaluation.map(|e| e.to_string()),
            analysis,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Result of the `game` command.
#[derive(Serialize)]
pub struct GameJson<'a> {
    /// File the notation was read from, `-` for stdin.
    pub source: &'a str,
    pub options: &'a GameOptions,
    pub report: &'a GameReport,
    pub created_at: String,
}

impl<'a> GameJson<'a> {
    pub fn new(source: &'a str, options: &'a GameOptions, report: &'a GameReport) -> Self {
        Self {
            source,
            options,
            report,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
