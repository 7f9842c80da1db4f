//! UCI info line parsing.

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

/// Marks a score reported while the search window failed high or low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Lower,
    Upper,
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Which line of a multipv search this is.
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Set when the score is only a bound.
    pub bound: Option<ScoreBound>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Parse UCI info line.
    ///
    /// Returns `None` if the line is not an `info` line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace().peekable();
        if parts.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::default();
        while let Some(key) = parts.next() {
            match key {
                "depth" => info.depth = parts.next().and_then(|v| v.parse().ok()),
                "seldepth" => info.seldepth = parts.next().and_then(|v| v.parse().ok()),
                "multipv" => info.multipv = parts.next().and_then(|v| v.parse().ok()),
                "nodes" => info.nodes = parts.next().and_then(|v| v.parse().ok()),
                "nps" => info.nps = parts.next().and_then(|v| v.parse().ok()),
                "time" => info.time = parts.next().and_then(|v| v.parse().ok()),
                "score" => {
                    let kind = parts.next();
                    let value = parts.next().and_then(|v| v.parse::<i32>().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(v)) => Some(Score::Cp(v)),
                        (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                        _ => None,
                    };
                    match parts.peek() {
                        Some(&"lowerbound") => {
                            info.bound = Some(ScoreBound::Lower);
                            parts.next();
                        }
                        Some(&"upperbound") => {
                            info.bound = Some(ScoreBound::Upper);
                            parts.next();
                        }
                        _ => {}
                    }
                }
                "pv" => {
                    info.pv.clear();
                    while let Some(mv) = parts.next_if(|p| !is_info_keyword(p)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    info.string = Some(rest.join(" "));
                }
                // move lists we do not track
                "refutation" | "currline" => {
                    while parts.next_if(|p| !is_info_keyword(p)).is_some() {}
                }
                // currmove, hashfull, tbhits, ... carry a single value we do not track
                _ if is_info_keyword(key) => {
                    parts.next();
                }
                _ => {}
            }
        }

        Some(info)
    }

    /// True when the line carries both a depth and an exact score.
    pub fn has_exact_score(&self) -> bool {
        self.depth.is_some() && self.score.is_some() && self.bound.is_none()
    }
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "sbhits"
            | "cpuload"
            | "refutation"
            | "currline"
            | "string"
    )
}
