//! UCI commands sent from the GUI to the engine.

use std::fmt;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// The next search belongs to a different game.
    UciNewGame,
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Depth and time limited search, the shape used for analysis.
    pub fn depth_and_movetime(depth: u32, movetime: u64) -> Self {
        Self {
            depth: Some(depth),
            movetime: Some(movetime),
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// `position fen <fen>` without trailing moves.
    pub fn position_fen(fen: &str) -> Self {
        GuiCommand::Position {
            fen: Some(fen.to_string()),
            moves: Vec::new(),
        }
    }

    /// Format the command as the line written to the engine (no newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(fen) => format!("position fen {}", fen.trim()),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                if opts.infinite {
                    parts.push("infinite".to_string());
                }
                parts.join(" ")
            }
            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}
