//! Seam between the analysis pipeline and engine processes.
//!
//! The pipeline is generic over [`EngineProvider`] so it can run against the
//! real [`EnginePool`](crate::EnginePool) or against a scripted engine in tests.
//! Methods return `impl Future + Send` so pipeline futures stay `Send` and can
//! be spawned on a multi-threaded runtime.

use std::future::Future;

use crate::analyzer::{AnalysisRequest, AnalysisResult};
use crate::engine::EngineError;

/// An engine checked out for the exclusive use of one analysis run.
pub trait AnalysisSession: Send {
    /// Analyse one position, blocking the caller until `bestmove` or the deadline.
    fn analyze(
        &mut self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, EngineError>> + Send;
}

/// Hands out sessions and takes them back.
pub trait EngineProvider: Send + Sync {
    type Session: AnalysisSession;

    /// Start a fresh, ready engine for one run.
    fn acquire(&self) -> impl Future<Output = Result<Self::Session, EngineError>> + Send;

    /// Shut the engine down. Must be called on every path once `acquire` succeeded.
    fn release(&self, session: Self::Session) -> impl Future<Output = ()> + Send;
}
