//! A single UCI engine process and its lifecycle state machine.
//!
//! [`EngineProcess`] owns the operating-system process, the pipes connected to
//! it and an explicit [`EngineState`]. Processes are created and torn down by
//! [`EnginePool`](crate::EnginePool); analysis code only borrows them.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;
use uci::{EngineMessage, GuiCommand};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::pool::EngineRegistry;

/// Errors that can occur when working with engine processes.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[source] std::io::Error),
    /// The engine did not answer the UCI handshake in time.
    #[error("Engine did not become ready within {0:?}")]
    StartupTimeout(Duration),
    /// The process exited or one of its streams closed or failed.
    #[error("Engine communication error: {0}")]
    Communication(String),
    /// The engine is alive but stopped answering.
    #[error("Engine unresponsive: {0}")]
    Unresponsive(String),
    /// A lifecycle step was attempted from the wrong state.
    #[error("Invalid engine state transition from {from} to {to}")]
    InvalidTransition { from: EngineState, to: EngineState },
    /// The pool no longer hands out engines.
    #[error("Engine pool is closed")]
    PoolClosed,
}

/// Identifier of one engine process, unique per acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(Uuid);

impl EngineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is plenty to tell concurrent processes apart in logs.
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}

/// Lifecycle of an engine process.
///
/// `Starting → Ready → Busy → Closing → Closed`, where `Ready` and `Busy`
/// alternate once per search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Spawned, handshake not finished.
    Starting,
    /// Idle and synchronised.
    Ready,
    /// A search is running or its `bestmove` is still outstanding.
    Busy,
    /// `quit` sent, waiting for the process to exit.
    Closing,
    /// Process exited or was killed.
    Closed,
}

impl EngineState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Starting, Ready)
                | (Ready, Busy)
                | (Busy, Ready)
                | (Starting | Ready | Busy, Closing)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Starting => "starting",
            EngineState::Ready => "ready",
            EngineState::Busy => "busy",
            EngineState::Closing => "closing",
            EngineState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One running UCI engine.
///
/// Dropping a process that was not shut down kills it.
pub struct EngineProcess {
    id: EngineId,
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    state: EngineState,
    name: Option<String>,
    response_margin: Duration,
    stop_grace: Duration,
    registry: Option<Arc<EngineRegistry>>,
}

impl EngineProcess {
    /// Spawns the engine process. The process starts in [`EngineState::Starting`].
    pub(crate) fn spawn(
        config: &EngineConfig,
        registry: Option<Arc<EngineRegistry>>,
    ) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::SpawnError)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Communication("engine stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Communication("engine stdout unavailable".to_string()))?;

        let id = EngineId::new();
        if let Some(registry) = &registry {
            registry.insert(id, EngineState::Starting);
        }
        tracing::debug!(engine = %id, path = %config.path.display(), "engine process spawned");

        Ok(Self {
            id,
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            state: EngineState::Starting,
            name: None,
            response_margin: config.response_margin(),
            stop_grace: config.stop_grace(),
            registry,
        })
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The engine's name as reported via `id name`, once the handshake is done.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Slack granted on top of a search's time budget.
    pub fn response_margin(&self) -> Duration {
        self.response_margin
    }

    /// How long to wait for `bestmove` after sending `stop`.
    pub fn stop_grace(&self) -> Duration {
        self.stop_grace
    }

    /// Moves the state machine forward, rejecting transitions it does not allow.
    pub fn transition(&mut self, next: EngineState) -> Result<(), EngineError> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if let Some(registry) = &self.registry {
            registry.update(self.id, next);
        }
        Ok(())
    }

    /// Send a command to the engine.
    pub async fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let line = command.to_uci();
        tracing::debug!(engine = %self.id, ">> {}", line);
        let io_err = |e: std::io::Error| EngineError::Communication(e.to_string());
        self.stdin.write_all(line.as_bytes()).await.map_err(io_err)?;
        self.stdin.write_all(b"\n").await.map_err(io_err)?;
        self.stdin.flush().await.map_err(io_err)?;
        Ok(())
    }

    /// Reads the next message, or `None` once `deadline` passes.
    ///
    /// A closed output stream is an error: the engine is gone.
    pub async fn read_message(
        &mut self,
        deadline: Instant,
    ) -> Result<Option<EngineMessage>, EngineError> {
        match tokio::time::timeout_at(deadline, self.lines.next_line()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(Some(line))) => {
                tracing::debug!(engine = %self.id, "<< {}", line);
                Ok(Some(EngineMessage::parse(&line)))
            }
            Ok(Ok(None)) => Err(EngineError::Communication(
                "engine closed its output stream".to_string(),
            )),
            Ok(Err(e)) => Err(EngineError::Communication(e.to_string())),
        }
    }

    /// Reads and discards messages until one matches `wanted`.
    ///
    /// Returns `false` if `deadline` passes first.
    pub async fn wait_for<F>(&mut self, deadline: Instant, wanted: F) -> Result<bool, EngineError>
    where
        F: Fn(&EngineMessage) -> bool,
    {
        while let Some(message) = self.read_message(deadline).await? {
            if wanted(&message) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs the `uci` / `isready` handshake and moves to [`EngineState::Ready`].
    pub(crate) async fn handshake(&mut self, timeout: Duration) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;

        self.send(&GuiCommand::Uci).await?;
        loop {
            match self.read_message(deadline).await? {
                None => return Err(EngineError::StartupTimeout(timeout)),
                Some(EngineMessage::Id {
                    name: Some(name), ..
                }) => self.name = Some(name),
                Some(EngineMessage::UciOk) => break,
                Some(_) => {}
            }
        }

        self.send(&GuiCommand::IsReady).await?;
        if !self
            .wait_for(deadline, |m| *m == EngineMessage::ReadyOk)
            .await?
        {
            return Err(EngineError::StartupTimeout(timeout));
        }

        self.transition(EngineState::Ready)?;
        tracing::debug!(
            engine = %self.id,
            name = self.name.as_deref().unwrap_or("unknown"),
            "engine ready"
        );
        Ok(())
    }

    /// Asks the engine to quit, force-killing it if it is still running after `grace`.
    pub(crate) async fn shutdown(&mut self, grace: Duration) {
        if self.state == EngineState::Closed {
            return;
        }
        if self.state != EngineState::Closing {
            // Every live state may close.
            let _ = self.transition(EngineState::Closing);
        }

        if let Err(e) = self.send(&GuiCommand::Quit).await {
            tracing::debug!(engine = %self.id, error = %e, "could not send quit");
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(engine = %self.id, %status, "engine exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(engine = %self.id, error = %e, "waiting for engine failed, killing");
                self.kill().await;
            }
            Err(_) => {
                tracing::warn!(engine = %self.id, ?grace, "engine ignored quit, killing");
                self.kill().await;
            }
        }

        let _ = self.transition(EngineState::Closed);
    }

    /// Kills the process without asking it to quit first.
    pub(crate) async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(engine = %self.id, error = %e, "kill failed");
        }
        if self.state != EngineState::Closed {
            if self.state != EngineState::Closing {
                let _ = self.transition(EngineState::Closing);
            }
            let _ = self.transition(EngineState::Closed);
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.state != EngineState::Closed {
            tracing::warn!(
                engine = %self.id,
                state = %self.state,
                "engine dropped without release, killing"
            );
            let _ = self.child.start_kill();
            self.state = EngineState::Closed;
        }
        if let Some(registry) = &self.registry {
            registry.remove(self.id);
        }
    }
}

impl fmt::Debug for EngineProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineProcess")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("name", &self.name)
            .finish()
    }
}
