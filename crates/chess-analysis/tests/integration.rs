//! Integration tests for chess-analysis crate.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p chess-analysis --test integration -- --ignored`

use chess_analysis::{
    EngineConfig, EnginePool, EngineState, GameOptions, MoveQuality, ResultCache, ReviewConfig,
    ReviewService, START_FEN,
};
use std::sync::Arc;

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("quit")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn stockfish_service() -> ReviewService<EnginePool> {
    ReviewService::from_config(&ReviewConfig::default())
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_handshake_and_release() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let pool = EnginePool::new(EngineConfig::with_path("stockfish"));
    let lease = pool.acquire().await.expect("Failed to start Stockfish");

    let name = lease.name().unwrap_or_default().to_string();
    assert!(
        name.to_lowercase().contains("stockfish"),
        "Engine name should contain 'Stockfish', got: {}",
        name
    );
    assert_eq!(pool.state_of(lease.id()), Some(EngineState::Ready));

    pool.release(lease).await;
    assert_eq!(pool.active_count(), 0);
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_starting_position_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let service = stockfish_service();
    let result = service
        .analyze_position(START_FEN, 10, 2000)
        .await
        .expect("Failed to analyze starting position");

    assert!(result.best_move.is_some(), "Best move should be present");
    assert!(result.evaluation.is_some(), "Evaluation should be present");
    assert!(
        result.depth >= 10,
        "Search depth should be at least 10, got: {}",
        result.depth
    );
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_one_millisecond_budget_returns_result() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let service = stockfish_service();
    let started = std::time::Instant::now();
    let result = service
        .analyze_position(START_FEN, 30, 1)
        .await
        .expect("A tiny budget should still yield a result");

    let margin = ReviewConfig::default().engine.response_margin();
    let startup = ReviewConfig::default().engine.startup_timeout();
    assert!(started.elapsed() < startup + margin);
    assert!(result.best_move.is_some());
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_checkmated_position_has_no_best_move() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    // Fool's mate, white to move and mated.
    let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
    let result = stockfish_service()
        .analyze_position(fen, 5, 500)
        .await
        .expect("Failed to analyze mated position");

    assert!(result.best_move.is_none());
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_scholars_mate_game_review() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    // Scholar's mate: 1.e4 e5 2.Qh5 Nc6 3.Bc4 Nf6?? 4.Qxf7#
    let pgn = r#"[Event "Scholar's mate"]
[White "white_bot"]
[Black "black_bot"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6?? 4. Qxf7# 1-0
"#;
    let options = GameOptions {
        depth: 12,
        time_budget_ms: 500,
        cache_enabled: true,
    };
    let service = ReviewService::new(
        EnginePool::new(EngineConfig::with_path("stockfish")),
        Arc::new(ResultCache::default()),
    );

    let report = service
        .analyze_game(pgn, &options)
        .await
        .expect("Failed to analyze game");

    assert_eq!(report.moves.len(), 7);
    assert_eq!(report.metadata.white.as_deref(), Some("white_bot"));
    for pair in report.moves.windows(2) {
        assert_eq!(pair[0].fen_after, pair[1].fen_before);
    }

    // Find the g8f6 (Nf6) move - it's ply index 5
    let nf6_move = &report.moves[5];
    assert_eq!(nf6_move.uci, "g8f6", "Ply 6 should be g8f6 (Nf6)");
    assert_eq!(
        nf6_move.quality,
        MoveQuality::Blunder,
        "Nf6 should be classified as a Blunder, got: {:?}. CP loss: {:?}",
        nf6_move.quality,
        nf6_move.centipawn_loss
    );

    let mate = &report.moves[6];
    assert_eq!(mate.san, "Qxf7#");
    assert_eq!(mate.quality, MoveQuality::Excellent);

    // Same request again is served from the cache.
    let again = service.analyze_game(pgn, &options).await.unwrap();
    assert!(Arc::ptr_eq(&report, &again));
    assert_eq!(service.provider().active_count(), 0);
}
