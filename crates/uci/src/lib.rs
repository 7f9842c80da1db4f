//! UCI (Universal Chess Interface) protocol library, GUI side.
//!
//! This crate provides the commands a GUI (or analysis driver) sends to a
//! chess engine and the parsing of the lines the engine answers with.
//!
//! # Commands sent to the engine
//!
//! - `uci` - Initialize engine, get id and options
//! - `isready` / `readyok` - Synchronization
//! - `ucinewgame` - Forget state from a previous game
//! - `position fen <fen> [moves <move>...]` - Set position
//! - `go [depth <d>] [movetime <ms>]` - Start search
//! - `stop` - Stop search
//! - `quit` - Exit engine
//!
//! # Messages read from the engine
//!
//! - `id name <name>` / `id author <author>`
//! - `uciok`, `readyok`
//! - `info depth <d> score cp|mate <n> ... pv <moves>`
//! - `bestmove <move> [ponder <move>]`

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, Score, ScoreBound};

/// Token an engine sends as `bestmove` when the position has no legal moves.
pub const NULL_BESTMOVE: &str = "(none)";

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Search finished. `mv` is `None` when the engine answered `bestmove (none)`.
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else (option declarations, copyright banners, ...).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// Never fails: lines that are not understood come back as [`EngineMessage::Other`].
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("uciok") => EngineMessage::UciOk,
            Some("readyok") => EngineMessage::ReadyOk,
            Some("info") => match EngineInfo::parse(line) {
                Some(info) => EngineMessage::Info(info),
                None => EngineMessage::Other(line.to_string()),
            },
            Some("bestmove") => {
                let mv = parts
                    .next()
                    .filter(|m| *m != NULL_BESTMOVE && *m != "0000")
                    .map(str::to_string);
                let ponder = match parts.next() {
                    Some("ponder") => parts.next().map(str::to_string),
                    _ => None,
                };
                EngineMessage::BestMove { mv, ponder }
            }
            Some("id") => {
                let rest: Vec<&str> = parts.collect();
                match rest.split_first() {
                    Some((&"name", value)) => EngineMessage::Id {
                        name: Some(value.join(" ")),
                        author: None,
                    },
                    Some((&"author", value)) => EngineMessage::Id {
                        name: None,
                        author: Some(value.join(" ")),
                    },
                    _ => EngineMessage::Other(line.to_string()),
                }
            }
            _ => EngineMessage::Other(line.to_string()),
        }
    }

    /// Returns true for the line that terminates a search.
    pub fn is_bestmove(&self) -> bool {
        matches!(self, EngineMessage::BestMove { .. })
    }
}
