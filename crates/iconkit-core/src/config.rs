//! Pipeline configuration
//!
//! Loaded from TOML or built in code with the `with_*` methods:
//!
//! ```toml
//! resolutions = [16, 32, 256]
//! namespace = "per-request"
//! invoke_timeout_secs = 30
//! compression = "stored"
//! fallback_base_name = "icon"
//! ```

use crate::error::ConfigError;
use crate::types::{OperationKind, DEFAULT_BASE_NAME, ICON_RESOLUTIONS};
use iconkit_artifact::Compression;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How staging paths are laid out in the engine namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceScope {
    /// Fixed literal paths; requests are serialized through the session gate
    #[default]
    Shared,
    /// Input and containers under a unique request directory; PNG-set
    /// operations still write the fixed root paths and stay serialized
    PerRequest,
}

impl NamespaceScope {
    /// Whether a run of `kind` must hold the session gate
    #[inline]
    #[must_use]
    pub fn is_exclusive(self, kind: OperationKind) -> bool {
        match self {
            Self::Shared => true,
            Self::PerRequest => kind.is_multi_output(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// PNG edge lengths expected from the PNG-set operations
    pub resolutions: Vec<u32>,
    /// Staging path layout
    pub namespace: NamespaceScope,
    /// Limit on a single native call, in seconds
    pub invoke_timeout_secs: Option<u64>,
    /// Zip entry compression
    pub compression: Compression,
    /// Base name used when the source filename yields none
    pub fallback_base_name: String,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML or unknown keys and
    /// `ConfigError::Invalid` for out-of-range values
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Read` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value constraints
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolutions.is_empty() {
            return Err(invalid("resolutions", "at least one resolution is required"));
        }
        if self.resolutions.contains(&0) {
            return Err(invalid("resolutions", "resolutions must be positive"));
        }
        let mut sorted = self.resolutions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.resolutions.len() {
            return Err(invalid("resolutions", "resolutions must be unique"));
        }
        if self.invoke_timeout_secs == Some(0) {
            return Err(invalid("invoke_timeout_secs", "timeout must be positive"));
        }
        if self.fallback_base_name.is_empty() || self.fallback_base_name.contains(['/', '\\']) {
            return Err(invalid(
                "fallback_base_name",
                "must be a non-empty file name",
            ));
        }
        Ok(())
    }

    /// With explicit resolutions
    #[inline]
    #[must_use]
    pub fn with_resolutions(mut self, resolutions: impl Into<Vec<u32>>) -> Self {
        self.resolutions = resolutions.into();
        self
    }

    /// With namespace scope
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceScope) -> Self {
        self.namespace = namespace;
        self
    }

    /// With a native call time limit
    #[inline]
    #[must_use]
    pub fn with_invoke_timeout(mut self, secs: u64) -> Self {
        self.invoke_timeout_secs = Some(secs);
        self
    }

    /// With zip entry compression
    #[inline]
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// With fallback base name
    #[inline]
    #[must_use]
    pub fn with_fallback_base_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_base_name = name.into();
        self
    }

    /// Native call time limit as a `Duration`
    #[inline]
    #[must_use]
    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolutions: ICON_RESOLUTIONS.to_vec(),
            namespace: NamespaceScope::Shared,
            invoke_timeout_secs: None,
            compression: Compression::Deflated,
            fallback_base_name: DEFAULT_BASE_NAME.to_string(),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_standard_sizes() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolutions, ICON_RESOLUTIONS.to_vec());
        assert_eq!(config.namespace, NamespaceScope::Shared);
        assert_eq!(config.fallback_base_name, "output");
        assert!(config.invoke_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn png_producing_kinds_are_exclusive_in_every_scope() {
        for kind in OperationKind::ALL {
            assert!(NamespaceScope::Shared.is_exclusive(kind));
            assert_eq!(NamespaceScope::PerRequest.is_exclusive(kind), kind.is_multi_output());
        }
    }

    #[test]
    fn parse_full_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            resolutions = [16, 32, 256]
            namespace = "per-request"
            invoke_timeout_secs = 30
            compression = "stored"
            fallback_base_name = "icon"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            PipelineConfig::new()
                .with_resolutions(vec![16, 32, 256])
                .with_namespace(NamespaceScope::PerRequest)
                .with_invoke_timeout(30)
                .with_compression(Compression::Stored)
                .with_fallback_base_name("icon")
        );
        assert_eq!(config.invoke_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (toml, field) in [
            ("resolutions = []", "resolutions"),
            ("resolutions = [16, 0]", "resolutions"),
            ("resolutions = [16, 16]", "resolutions"),
            ("invoke_timeout_secs = 0", "invoke_timeout_secs"),
            ("fallback_base_name = \"\"", "fallback_base_name"),
            ("fallback_base_name = \"a/b\"", "fallback_base_name"),
        ] {
            match PipelineConfig::from_toml_str(toml) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field, "{toml}"),
                other => panic!("expected Invalid for {toml}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
