//! Conversion engine seam and session
//!
//! The native converter is reached only through [`ConversionEngine`]:
//! namespace file exchange plus a named call returning an integer status.
//! [`EngineSession`] owns one engine and makes its lifecycle explicit:
//! `Created` until [`initialize`](EngineSession::initialize) completes, then
//! `Ready` for the rest of the process. There is no shutdown.

use crate::error::EngineError;
use crate::staging::StagingAdapter;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Capability interface of a native conversion engine
///
/// Paths are namespace paths, not host paths. Implementations decide how the
/// namespace is stored.
#[async_trait::async_trait]
pub trait ConversionEngine: Send + Sync {
    /// One-time setup; resolves once the engine is ready
    async fn initialize(&self) -> Result<(), EngineError>;

    /// Place `data` at `path`
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Bytes at `path`, or `None` if nothing is there
    async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, EngineError>;

    /// Delete `path`; deleting an absent path succeeds
    async fn remove_file(&self, path: &str) -> Result<(), EngineError>;

    /// Call a named native operation and return its raw status code
    async fn call(&self, operation: &str, args: &[&str]) -> Result<i32, EngineError>;
}

/// Lifecycle of an engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet initialized
    Created,
    /// Initialized; conversions may run
    Ready,
}

/// Handle to one initialized conversion engine
///
/// Shared by reference (usually `Arc<EngineSession>`) with every pipeline
/// that converts through it.
pub struct EngineSession {
    engine: Arc<dyn ConversionEngine>,
    state: RwLock<SessionState>,
    init_lock: Mutex<()>,
    gate: Mutex<()>,
}

impl EngineSession {
    /// Wrap an engine; the session starts in `Created`
    #[must_use]
    pub fn new(engine: impl ConversionEngine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    /// Wrap an already shared engine
    #[must_use]
    pub fn from_arc(engine: Arc<dyn ConversionEngine>) -> Self {
        Self {
            engine,
            state: RwLock::new(SessionState::Created),
            init_lock: Mutex::new(()),
            gate: Mutex::new(()),
        }
    }

    /// Initialize the engine, suspending until it reports ready
    ///
    /// Calling this on a ready session does nothing.
    ///
    /// # Errors
    /// Returns the engine's error; the session stays `Created` and may be
    /// initialized again
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let _init = self.init_lock.lock().await;
        if self.is_ready() {
            tracing::debug!("engine session already initialized");
            return Ok(());
        }

        tracing::info!("initializing conversion engine");
        self.engine.initialize().await?;
        *self.state.write() = SessionState::Ready;
        tracing::info!("conversion engine ready");
        Ok(())
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether `initialize` has completed
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// The engine, if the session is ready
    ///
    /// # Errors
    /// Returns `EngineError::NotInitialized` before `initialize` completes
    pub fn engine(&self) -> Result<&dyn ConversionEngine, EngineError> {
        if self.is_ready() {
            Ok(self.engine.as_ref())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    /// Staging access to the engine namespace
    #[inline]
    #[must_use]
    pub fn staging(&self) -> StagingAdapter<'_> {
        StagingAdapter::new(self)
    }

    /// Exclusive use of the shared fixed-path namespace
    ///
    /// Held by a pipeline for a whole request when paths are not request
    /// scoped.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::MemoryNamespace;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEngine {
        inits: AtomicUsize,
        fail_init: bool,
        files: MemoryNamespace,
    }

    #[async_trait::async_trait]
    impl ConversionEngine for CountingEngine {
        async fn initialize(&self) -> Result<(), EngineError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                Err(EngineError::InitFailed("no runtime".into()))
            } else {
                Ok(())
            }
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
            self.files.write(path, data)
        }

        async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, EngineError> {
            self.files.read(path)
        }

        async fn remove_file(&self, path: &str) -> Result<(), EngineError> {
            self.files.remove(path)
        }

        async fn call(&self, _operation: &str, _args: &[&str]) -> Result<i32, EngineError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn session_starts_created() {
        let session = EngineSession::new(CountingEngine::default());
        assert_eq!(session.state(), SessionState::Created);
        assert!(matches!(session.engine(), Err(EngineError::NotInitialized)));
    }

    #[tokio::test]
    async fn initialize_runs_engine_setup_once() {
        let engine = Arc::new(CountingEngine::default());
        let session = EngineSession::from_arc(engine.clone());

        session.initialize().await.unwrap();
        session.initialize().await.unwrap();

        assert!(session.is_ready());
        assert!(session.engine().is_ok());
        assert_eq!(engine.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_initialize_leaves_session_created() {
        let session = EngineSession::new(CountingEngine {
            fail_init: true,
            ..CountingEngine::default()
        });
        assert!(matches!(
            session.initialize().await,
            Err(EngineError::InitFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Created);
    }

    #[tokio::test]
    async fn gate_is_exclusive() {
        let session = EngineSession::new(CountingEngine::default());
        let guard = session.exclusive().await;
        assert!(session.gate.try_lock().is_err());
        drop(guard);
        assert!(session.gate.try_lock().is_ok());
    }
}
