//! Conversion invoker
//!
//! Calls the native entry point for a request's operation and interprets the
//! returned integer: `0` is success, anything else is a failure code.

use crate::engine::EngineSession;
use crate::error::EngineError;
use crate::request::ConversionRequest;
use crate::types::ConversionStatus;

/// Runs native conversion calls against a session
#[derive(Debug, Clone, Copy)]
pub struct ConversionInvoker<'a> {
    session: &'a EngineSession,
}

impl<'a> ConversionInvoker<'a> {
    #[inline]
    #[must_use]
    pub fn new(session: &'a EngineSession) -> Self {
        Self { session }
    }

    /// Invoke the native operation for `request`
    ///
    /// A nonzero status is returned as `ConversionStatus::Failed`, not as an
    /// error.
    ///
    /// # Errors
    /// Returns `EngineError::NotInitialized` before the session is ready, or
    /// the engine's error if the call could not be made
    pub async fn invoke(&self, request: &ConversionRequest) -> Result<ConversionStatus, EngineError> {
        let engine = self.session.engine()?;
        let operation = request.kind().native_name();
        let args = request.native_args();

        tracing::debug!(operation, ?args, "invoking native conversion");
        let code = engine.call(operation, &args).await?;
        let status = ConversionStatus::from_code(code);

        if status.is_ok() {
            tracing::debug!(operation, "native conversion succeeded");
        } else {
            tracing::warn!(operation, code, "native conversion returned failure status");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceScope;
    use crate::engine::ConversionEngine;
    use crate::types::OperationKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct RecordingEngine {
        status: i32,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl RecordingEngine {
        fn returning(status: i32) -> Self {
            Self {
                status,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ConversionEngine for RecordingEngine {
        async fn initialize(&self) -> Result<(), EngineError> {
            Ok(())
        }
        async fn write_file(&self, _path: &str, _data: &[u8]) -> Result<(), EngineError> {
            Ok(())
        }
        async fn read_file(&self, _path: &str) -> Result<Option<Vec<u8>>, EngineError> {
            Ok(None)
        }
        async fn remove_file(&self, _path: &str) -> Result<(), EngineError> {
            Ok(())
        }
        async fn call(&self, operation: &str, args: &[&str]) -> Result<i32, EngineError> {
            self.calls.lock().push((
                operation.to_string(),
                args.iter().map(|a| (*a).to_string()).collect(),
            ));
            Ok(self.status)
        }
    }

    #[tokio::test]
    async fn zero_is_success_and_args_are_forwarded() {
        let engine = Arc::new(RecordingEngine::returning(0));
        let session = EngineSession::from_arc(engine.clone());
        session.initialize().await.unwrap();

        let request = ConversionRequest::new(OperationKind::Icns, NamespaceScope::Shared);
        let status = ConversionInvoker::new(&session).invoke(&request).await.unwrap();

        assert_eq!(status, ConversionStatus::Ok);
        let calls = engine.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "wasm_convert_to_icns");
        assert_eq!(calls[0].1, vec!["input.png", "output.icns"]);
    }

    #[tokio::test]
    async fn nonzero_is_failed_status() {
        for code in [1, -1, 42] {
            let session = EngineSession::new(RecordingEngine::returning(code));
            session.initialize().await.unwrap();
            let request = ConversionRequest::new(OperationKind::Ico, NamespaceScope::Shared);
            let status = ConversionInvoker::new(&session).invoke(&request).await.unwrap();
            assert_eq!(status, ConversionStatus::Failed(code));
        }
    }

    #[tokio::test]
    async fn uninitialized_session_is_rejected() {
        let engine = Arc::new(RecordingEngine::returning(0));
        let session = EngineSession::from_arc(engine.clone());
        let request = ConversionRequest::new(OperationKind::Ico, NamespaceScope::Shared);
        let err = ConversionInvoker::new(&session).invoke(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        assert!(engine.calls.lock().is_empty());
    }
}
