//! Fake UCI engines for tests: small `sh` scripts run through [`EnginePool`](crate::EnginePool).

use std::io::Write;

use tempfile::NamedTempFile;

use crate::config::EngineConfig;

pub(crate) const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Answers the handshake and every search immediately.
pub(crate) const STANDARD: &str = r#"
while IFS= read -r line; do
  case "$line" in
    uci) echo "id name FakeFish 1.0"; echo "id author chess-review tests"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      echo "info depth 1 score cp 13 nodes 20 pv e2e4"
      echo "info depth 2 seldepth 3 score cp 31 nodes 400 pv e2e4 e7e5"
      echo "bestmove e2e4 ponder e7e5"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Never answers anything.
pub(crate) const SILENT: &str = r#"
while IFS= read -r line; do
  :
done
"#;

/// Behaves normally but never exits on `quit`.
pub(crate) const IGNORES_QUIT: &str = r#"
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "bestmove e2e4" ;;
  esac
done
"#;

/// Exits as soon as a search starts.
pub(crate) const CRASH_ON_GO: &str = r#"
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) exit 3 ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Starts thinking and never sends `bestmove`, not even after `stop`.
pub(crate) const STUCK: &str = r#"
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 6 score cp -45 nodes 900 pv g8f6 c2c4" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Thinks until told to stop, then answers.
pub(crate) const STOPPABLE: &str = r#"
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 7 score mate 4 nodes 1200 pv d8h4 g2g3" ;;
    stop) echo "bestmove d8h4 ponder g2g3" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Answers the first `isready` after the handshake a second late.
pub(crate) const SLOW_SECOND_READY: &str = r#"
n=0
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready)
      n=$((n + 1))
      if [ "$n" -eq 2 ]; then sleep 1; fi
      echo "readyok" ;;
    go*)
      echo "info depth 3 score cp 20 nodes 300 pv d2d4 d7d5"
      echo "bestmove d2d4" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Writes `body` to a temporary script. Keep the handle alive while the engine runs.
pub(crate) fn script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create fake engine script");
    file.write_all(body.as_bytes()).expect("write fake engine script");
    file.flush().expect("flush fake engine script");
    file
}

/// Engine config running `script` through `sh`, with short timeouts.
pub(crate) fn fake_engine_config(script: &NamedTempFile) -> EngineConfig {
    EngineConfig {
        path: "sh".into(),
        args: vec![script.path().display().to_string()],
        startup_timeout_ms: 2_000,
        quit_grace_ms: 500,
        response_margin_ms: 300,
        stop_grace_ms: 200,
        max_processes: 0,
    }
}
