//! Engine backed by an external converter program
//!
//! The namespace is a private temporary directory. A native call runs
//! `<program> [leading args] <operation> <paths...>` with that directory as
//! its working directory and every path argument made root-relative. The
//! exit code is the call's status; death by signal reports `-1`.

use iconkit_core::{normalize_path, ConversionEngine, EngineError};
use parking_lot::RwLock;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// Status reported when the converter exits without a code
pub const SIGNAL_STATUS: i32 = -1;

/// Conversion engine that shells out to a converter program
#[derive(Debug)]
pub struct ProcessEngine {
    program: PathBuf,
    leading_args: Vec<String>,
    resolved: RwLock<Option<PathBuf>>,
    root: TempDir,
}

impl ProcessEngine {
    /// Engine running `program`, namespaced in a fresh temporary directory
    ///
    /// The program is looked up on `initialize`, not here.
    ///
    /// # Errors
    /// Returns `EngineError::Io` if the namespace directory cannot be created
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = tempfile::Builder::new()
            .prefix("iconkit-")
            .tempdir()
            .map_err(|source| EngineError::Io {
                path: std::env::temp_dir().display().to_string(),
                source,
            })?;
        Ok(Self {
            program: program.into(),
            leading_args: Vec::new(),
            resolved: RwLock::new(None),
            root,
        })
    }

    /// Arguments placed before the operation name, e.g. a script path
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Host directory backing the namespace
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Resolved program path, once initialized
    #[must_use]
    pub fn program_path(&self) -> Option<PathBuf> {
        self.resolved.read().clone()
    }

    fn host_path(&self, path: &str) -> Result<PathBuf, EngineError> {
        Ok(self.root.path().join(normalize_path(path)?))
    }

    fn io_error(path: &Path, source: io::Error) -> EngineError {
        EngineError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl ConversionEngine for ProcessEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        let resolved = which::which(&self.program).map_err(|e| {
            EngineError::InitFailed(format!("{}: {e}", self.program.display()))
        })?;
        tracing::info!(
            program = %resolved.display(),
            root = %self.root.path().display(),
            "converter program resolved"
        );
        *self.resolved.write() = Some(resolved);
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        let target = self.host_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| Self::io_error(&target, e))
    }

    async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let target = self.host_path(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&target, e)),
        }
    }

    async fn remove_file(&self, path: &str) -> Result<(), EngineError> {
        let target = self.host_path(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&target, e)),
        }
    }

    async fn call(&self, operation: &str, args: &[&str]) -> Result<i32, EngineError> {
        let program = self.program_path().ok_or(EngineError::NotInitialized)?;
        let relative = args
            .iter()
            .map(|arg| normalize_path(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let output = Command::new(&program)
            .args(&self.leading_args)
            .arg(operation)
            .args(&relative)
            .current_dir(self.root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Call {
                operation: operation.to_string(),
                message: format!("failed to run {}: {e}", program.display()),
            })?;

        let code = output.status.code().unwrap_or(SIGNAL_STATUS);
        if code != 0 {
            tracing::debug!(
                operation,
                code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "converter exited unsuccessfully"
            );
        }
        Ok(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"#!/bin/sh
op="$1"; shift
case "$op" in
  wasm_convert_to_ico) cp "$1" "$2" ;;
  wasm_convert_to_icns) echo "no icns support" >&2; exit 3 ;;
  pwd) pwd > "$1" ;;
  hang) kill -9 $$ ;;
  *) exit 9 ;;
esac
"#;

    fn scripted(dir: &Path) -> ProcessEngine {
        let path = dir.join("converter.sh");
        std::fs::write(&path, SCRIPT).unwrap();
        ProcessEngine::new("sh")
            .unwrap()
            .with_leading_args([path.display().to_string()])
    }

    async fn ready(dir: &Path) -> ProcessEngine {
        let engine = scripted(dir);
        engine.initialize().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn files_round_trip_through_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;

        engine.write_file("/req-1/input.png", b"png").await.unwrap();
        assert!(engine.root().join("req-1/input.png").exists());
        assert_eq!(engine.read_file("req-1/input.png").await.unwrap().unwrap(), b"png");

        engine.remove_file("/req-1/input.png").await.unwrap();
        engine.remove_file("/req-1/input.png").await.unwrap();
        assert_eq!(engine.read_file("/req-1/input.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn exit_codes_are_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;
        engine.write_file("input.png", b"png").await.unwrap();

        let ok = engine
            .call("wasm_convert_to_ico", &["input.png", "/output.ico"])
            .await
            .unwrap();
        assert_eq!(ok, 0);
        assert_eq!(engine.read_file("output.ico").await.unwrap().unwrap(), b"png");

        let failed = engine
            .call("wasm_convert_to_icns", &["input.png", "output.icns"])
            .await
            .unwrap();
        assert_eq!(failed, 3);
        assert_eq!(engine.call("unknown", &[]).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn signal_death_reports_minus_one() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;
        assert_eq!(engine.call("hang", &[]).await.unwrap(), SIGNAL_STATUS);
    }

    #[tokio::test]
    async fn calls_run_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;
        assert_eq!(engine.call("pwd", &["/cwd.txt"]).await.unwrap(), 0);

        let cwd = String::from_utf8(engine.read_file("cwd.txt").await.unwrap().unwrap()).unwrap();
        let expected = engine.root().canonicalize().unwrap();
        assert_eq!(Path::new(cwd.trim_end()).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn call_before_initialize_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted(dir.path());
        assert!(matches!(
            engine.call("wasm_convert_to_ico", &["input.png", "output.ico"]).await,
            Err(EngineError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn program_is_resolved_on_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;
        let resolved = engine.program_path().unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved.file_name().unwrap(), "sh");
    }

    #[tokio::test]
    async fn missing_program_fails_initialize() {
        let engine = ProcessEngine::new("iconkit-no-such-converter").unwrap();
        assert!(matches!(engine.initialize().await, Err(EngineError::InitFailed(_))));
        assert!(engine.program_path().is_none());
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready(dir.path()).await;
        assert!(matches!(
            engine.write_file("../escape.png", b"x").await,
            Err(EngineError::InvalidPath(_))
        ));
        assert!(matches!(
            engine.call("wasm_convert_to_ico", &["input.png", "../../etc/x"]).await,
            Err(EngineError::InvalidPath(_))
        ));
    }
}
