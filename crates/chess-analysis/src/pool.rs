//! Engine pool / lifecycle manager.
//!
//! Every [`EnginePool::acquire`] launches a fresh engine process so that
//! concurrent analyses never share engine state. The pool keeps a registry of
//! live processes keyed by [`EngineId`] and optionally bounds how many may run
//! at once with a semaphore.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::analyzer::{self, AnalysisRequest, AnalysisResult};
use crate::config::EngineConfig;
use crate::engine::{EngineError, EngineId, EngineProcess, EngineState};
use crate::provider::{AnalysisSession, EngineProvider};

/// States of every live process, keyed by id.
#[derive(Debug, Default)]
pub(crate) struct EngineRegistry {
    states: Mutex<HashMap<EngineId, EngineState>>,
}

impl EngineRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EngineId, EngineState>> {
        // The map holds plain values, so a poisoned lock is still consistent.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn insert(&self, id: EngineId, state: EngineState) {
        self.lock().insert(id, state);
    }

    pub(crate) fn update(&self, id: EngineId, state: EngineState) {
        if let Some(entry) = self.lock().get_mut(&id) {
            *entry = state;
        }
    }

    pub(crate) fn remove(&self, id: EngineId) {
        self.lock().remove(&id);
    }

    fn get(&self, id: EngineId) -> Option<EngineState> {
        self.lock().get(&id).copied()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Creates, tracks and tears down engine processes.
pub struct EnginePool {
    config: EngineConfig,
    registry: Arc<EngineRegistry>,
    permits: Option<Arc<Semaphore>>,
    closed: AtomicBool,
}

impl EnginePool {
    /// Create a new engine pool.
    ///
    /// `config.max_processes == 0` leaves the number of live processes unbounded.
    pub fn new(config: EngineConfig) -> Self {
        let permits = (config.max_processes > 0)
            .then(|| Arc::new(Semaphore::new(config.max_processes)));
        Self {
            config,
            registry: Arc::new(EngineRegistry::default()),
            permits,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Launches a fresh engine and waits until it reports `readyok`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SpawnError`] if the executable cannot be started
    /// - [`EngineError::StartupTimeout`] if the handshake does not finish within
    ///   the configured startup timeout; the process is killed
    /// - [`EngineError::Communication`] if the process exits during the handshake
    /// - [`EngineError::PoolClosed`] once [`EnginePool::close`] has been called
    pub async fn acquire(&self) -> Result<EngineLease, EngineError> {
        if self.is_closed() {
            return Err(EngineError::PoolClosed);
        }
        let permit = match &self.permits {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::PoolClosed)?,
            ),
            None => None,
        };

        let mut process = EngineProcess::spawn(&self.config, Some(self.registry.clone()))?;
        if let Err(e) = process.handshake(self.config.startup_timeout()).await {
            tracing::warn!(engine = %process.id(), error = %e, "engine failed to start, killing");
            process.kill().await;
            return Err(e);
        }

        tracing::debug!(engine = %process.id(), live = self.active_count(), "engine acquired");
        Ok(EngineLease {
            process,
            _permit: permit,
        })
    }

    /// Sends `quit`, waits the grace period, then force-kills if needed.
    pub async fn release(&self, mut lease: EngineLease) {
        let id = lease.id();
        lease.process.shutdown(self.config.quit_grace()).await;
        drop(lease);
        tracing::debug!(engine = %id, live = self.active_count(), "engine released");
    }

    /// Number of engine processes currently alive.
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Lifecycle state of a live process, `None` once it has been torn down.
    pub fn state_of(&self, id: EngineId) -> Option<EngineState> {
        self.registry.get(id)
    }

    /// Closes the pool: waiting and future `acquire` calls fail with
    /// [`EngineError::PoolClosed`]. Already leased engines are unaffected.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(semaphore) = &self.permits {
            semaphore.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// An engine checked out of the pool.
///
/// Hand it back with [`EnginePool::release`]. Dropping it instead (error paths,
/// cancelled tasks) kills the process immediately.
#[derive(Debug)]
pub struct EngineLease {
    process: EngineProcess,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Deref for EngineLease {
    type Target = EngineProcess;

    fn deref(&self) -> &EngineProcess {
        &self.process
    }
}

impl DerefMut for EngineLease {
    fn deref_mut(&mut self) -> &mut EngineProcess {
        &mut self.process
    }
}

impl AnalysisSession for EngineLease {
    async fn analyze(&mut self, request: &AnalysisRequest) -> Result<AnalysisResult, EngineError> {
        analyzer::analyze(&mut self.process, request).await
    }
}

impl EngineProvider for EnginePool {
    type Session = EngineLease;

    async fn acquire(&self) -> Result<EngineLease, EngineError> {
        EnginePool::acquire(self).await
    }

    async fn release(&self, session: EngineLease) {
        EnginePool::release(self, session).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::evaluation::Evaluation;
    use crate::test_support::{fake_engine_config, script, CRASH_ON_GO, IGNORES_QUIT, SILENT, STANDARD};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_acquire_runs_handshake() {
        let engine = script(STANDARD);
        let pool = EnginePool::new(fake_engine_config(&engine));

        let lease = pool.acquire().await.unwrap();
        assert_eq!(lease.state(), EngineState::Ready);
        assert_eq!(lease.name(), Some("FakeFish 1.0"));
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.state_of(lease.id()), Some(EngineState::Ready));

        let id = lease.id();
        pool.release(lease).await;
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.state_of(id), None);
    }

    #[tokio::test]
    async fn test_each_acquire_gets_its_own_process() {
        let engine = script(STANDARD);
        let pool = EnginePool::new(fake_engine_config(&engine));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.active_count(), 2);

        pool.release(a).await;
        pool.release(b).await;
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_startup_timeout_kills_process() {
        let engine = script(SILENT);
        let mut config = fake_engine_config(&engine);
        config.startup_timeout_ms = 200;
        let pool = EnginePool::new(config);

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, EngineError::StartupTimeout(_)), "got {:?}", err);
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let pool = EnginePool::new(EngineConfig::with_path("/nonexistent/path/to/stockfish"));
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, EngineError::SpawnError(_)));
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_release_force_kills_engine_ignoring_quit() {
        let engine = script(IGNORES_QUIT);
        let mut config = fake_engine_config(&engine);
        config.quit_grace_ms = 100;
        let pool = EnginePool::new(config);

        let lease = pool.acquire().await.unwrap();
        let started = Instant::now();
        pool.release(lease).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_lease_is_deregistered() {
        let engine = script(STANDARD);
        let pool = EnginePool::new(fake_engine_config(&engine));

        let lease = pool.acquire().await.unwrap();
        assert_eq!(pool.active_count(), 1);
        drop(lease);
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_max_processes_bounds_live_engines() {
        let engine = script(STANDARD);
        let mut config = fake_engine_config(&engine);
        config.max_processes = 1;
        let pool = EnginePool::new(config);

        let first = pool.acquire().await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(200), pool.acquire()).await;
        assert!(blocked.is_err(), "second acquire should wait for a permit");

        pool.release(first).await;
        let second = pool.acquire().await.unwrap();
        pool.release(second).await;
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_acquire() {
        let engine = script(STANDARD);
        let pool = EnginePool::new(fake_engine_config(&engine));
        pool.close();
        assert!(matches!(pool.acquire().await, Err(EngineError::PoolClosed)));
        assert!(pool.is_closed());
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_acquire() {
        let engine = script(STANDARD);
        let mut config = fake_engine_config(&engine);
        config.max_processes = 1;
        let pool = Arc::new(EnginePool::new(config));

        let lease = pool.acquire().await.unwrap();
        let waiter = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await.map(|lease| lease.id()) }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        pool.close();
        assert!(matches!(waiter.await.unwrap(), Err(EngineError::PoolClosed)));

        // The engine already out keeps working until it is handed back.
        assert_eq!(pool.state_of(lease.id()), Some(EngineState::Ready));
        pool.release(lease).await;
        assert!(matches!(pool.acquire().await, Err(EngineError::PoolClosed)));
    }

    #[tokio::test]
    async fn test_engine_crash_is_communication_error() {
        let engine = script(CRASH_ON_GO);
        let pool = EnginePool::new(fake_engine_config(&engine));

        let mut lease = pool.acquire().await.unwrap();
        let request = AnalysisRequest::new(crate::test_support::START_FEN, 5, 100);
        let err = analyze(&mut lease, &request).await.unwrap_err();
        assert!(matches!(err, EngineError::Communication(_)), "got {:?}", err);
        pool.release(lease).await;
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_session_reuse_cycles_ready_and_busy() {
        let engine = script(STANDARD);
        let pool = EnginePool::new(fake_engine_config(&engine));

        let mut lease = pool.acquire().await.unwrap();
        let request = AnalysisRequest::new(crate::test_support::START_FEN, 5, 100);
        for _ in 0..3 {
            let result = AnalysisSession::analyze(&mut lease, &request).await.unwrap();
            assert_eq!(result.evaluation, Some(Evaluation::Centipawns(31)));
            assert_eq!(lease.state(), EngineState::Ready);
        }
        pool.release(lease).await;
    }
}
