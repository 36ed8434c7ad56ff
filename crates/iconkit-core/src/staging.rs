//! Staging adapter and namespace layout
//!
//! The adapter moves bytes in and out of the engine namespace. A missing
//! output is reported as `None` by [`StagingAdapter::try_read`] so callers can
//! tell "this one file is absent" apart from "the engine is unreachable".

use crate::config::NamespaceScope;
use crate::engine::EngineSession;
use crate::error::StagingError;
use crate::types::RequestId;

/// Reads and writes against a session's namespace
#[derive(Debug, Clone, Copy)]
pub struct StagingAdapter<'a> {
    session: &'a EngineSession,
}

impl<'a> StagingAdapter<'a> {
    /// Adapter over `session`
    #[inline]
    #[must_use]
    pub fn new(session: &'a EngineSession) -> Self {
        Self { session }
    }

    /// Place `bytes` at `path`
    ///
    /// # Errors
    /// Returns `StagingError::Write` if the engine is not initialized or the
    /// write fails
    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StagingError> {
        let write_error = |source| StagingError::Write {
            path: path.to_string(),
            source,
        };
        let engine = self.session.engine().map_err(write_error)?;
        engine.write_file(path, bytes).await.map_err(write_error)?;
        tracing::debug!(path, bytes = bytes.len(), "staged");
        Ok(())
    }

    /// Bytes at `path`, `None` if absent
    ///
    /// # Errors
    /// Returns `StagingError::Read` only when the engine itself is unreachable
    pub async fn try_read(&self, path: &str) -> Result<Option<Vec<u8>>, StagingError> {
        let read_error = |source| StagingError::Read {
            path: path.to_string(),
            source,
        };
        let engine = self.session.engine().map_err(read_error)?;
        engine.read_file(path).await.map_err(read_error)
    }

    /// Bytes at `path`
    ///
    /// # Errors
    /// Returns `StagingError::ArtifactMissing` if absent, `StagingError::Read`
    /// if the engine is unreachable
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StagingError> {
        self.try_read(path)
            .await?
            .ok_or_else(|| StagingError::ArtifactMissing(path.to_string()))
    }

    /// Delete `path` from the namespace
    ///
    /// # Errors
    /// Returns `StagingError::Write` if the engine is unreachable
    pub async fn remove(&self, path: &str) -> Result<(), StagingError> {
        let write_error = |source| StagingError::Write {
            path: path.to_string(),
            source,
        };
        let engine = self.session.engine().map_err(write_error)?;
        engine.remove_file(path).await.map_err(write_error)
    }
}

/// Namespace paths used by one request
///
/// Input and container paths follow the scope. The PNG-set operations always
/// write `/{size}.png` at the namespace root, so `png(size)` is the same in
/// every layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    input: String,
    ico: String,
    icns: String,
    both_prefix: String,
}

impl StagingLayout {
    /// Fixed literal paths shared by every request
    #[must_use]
    pub fn shared() -> Self {
        Self {
            input: "input.png".to_string(),
            ico: "output.ico".to_string(),
            icns: "output.icns".to_string(),
            both_prefix: "/output_both".to_string(),
        }
    }

    /// Paths under `/req-{id}` for one request
    #[must_use]
    pub fn for_request(id: RequestId) -> Self {
        let dir = format!("/req-{id}");
        Self {
            input: format!("{dir}/input.png"),
            ico: format!("{dir}/output.ico"),
            icns: format!("{dir}/output.icns"),
            both_prefix: format!("{dir}/output_both"),
        }
    }

    /// Layout for `scope`
    #[must_use]
    pub fn for_scope(scope: NamespaceScope, id: RequestId) -> Self {
        match scope {
            NamespaceScope::Shared => Self::shared(),
            NamespaceScope::PerRequest => Self::for_request(id),
        }
    }

    /// Staged source image
    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// ICO output of the to-ICO operation
    #[inline]
    #[must_use]
    pub fn ico_output(&self) -> &str {
        &self.ico
    }

    /// ICNS output of the to-ICNS operation
    #[inline]
    #[must_use]
    pub fn icns_output(&self) -> &str {
        &self.icns
    }

    /// Output prefix passed to the combined operation
    #[inline]
    #[must_use]
    pub fn both_prefix(&self) -> &str {
        &self.both_prefix
    }

    /// ICNS output of the combined operation
    #[must_use]
    pub fn both_icns(&self) -> String {
        format!("{}.icns", self.both_prefix)
    }

    /// ICO output of the combined operation
    #[must_use]
    pub fn both_ico(&self) -> String {
        format!("{}.ico", self.both_prefix)
    }

    /// PNG output for one edge length, fixed at the namespace root
    #[must_use]
    pub fn png(&self, size: u32) -> String {
        format!("/{size}.png")
    }

    /// Input and container paths, the ones that follow the scope
    #[must_use]
    pub fn scoped_paths(&self) -> Vec<String> {
        vec![
            self.input.clone(),
            self.ico.clone(),
            self.icns.clone(),
            self.both_icns(),
            self.both_ico(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_layout_uses_fixed_paths() {
        let layout = StagingLayout::shared();
        assert_eq!(layout.input(), "input.png");
        assert_eq!(layout.ico_output(), "output.ico");
        assert_eq!(layout.icns_output(), "output.icns");
        assert_eq!(layout.both_prefix(), "/output_both");
        assert_eq!(layout.both_icns(), "/output_both.icns");
        assert_eq!(layout.both_ico(), "/output_both.ico");
        assert_eq!(layout.png(16), "/16.png");
        assert_eq!(layout.png(1024), "/1024.png");
    }

    #[test]
    fn request_layouts_are_disjoint() {
        let a = StagingLayout::for_request(RequestId::new());
        let b = StagingLayout::for_request(RequestId::new());
        assert_ne!(a.input(), b.input());
        assert!(a.input().starts_with("/req-"));

        let a_paths = a.scoped_paths();
        let b_paths = b.scoped_paths();
        assert_eq!(a_paths.len(), 5);
        assert!(a_paths.iter().all(|p| !b_paths.contains(p)));
    }

    #[test]
    fn png_paths_ignore_scope() {
        let request = StagingLayout::for_request(RequestId::new());
        assert_eq!(request.png(16), "/16.png");
        assert_eq!(request.png(512), StagingLayout::shared().png(512));
    }

    #[test]
    fn scope_selects_layout() {
        let id = RequestId::new();
        assert_eq!(
            StagingLayout::for_scope(NamespaceScope::Shared, id),
            StagingLayout::shared()
        );
        assert_eq!(
            StagingLayout::for_scope(NamespaceScope::PerRequest, id),
            StagingLayout::for_request(id)
        );
    }
}
