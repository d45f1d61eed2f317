//! Service configuration

use crate::error::OnboardingError;
use onboard_schema::DEFAULT_MAX_ENTITIES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Onboarding service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OnboardingConfig {
    /// Run the flag synchronizer on aggregate reads
    pub sync_legacy_flags: bool,
    /// Mask sensitive values in field progress
    pub mask_sensitive_values: bool,
    /// Collection batch cap
    pub max_entities_per_submission: usize,
    /// Logging
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            sync_legacy_flags: true,
            mask_sensitive_values: true,
            max_entities_per_submission: DEFAULT_MAX_ENTITIES,
            log: LogConfig::default(),
        }
    }
}

impl OnboardingConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With legacy flag synchronisation on or off
    #[inline]
    #[must_use]
    pub fn with_flag_sync(mut self, enabled: bool) -> Self {
        self.sync_legacy_flags = enabled;
        self
    }

    /// With sensitive value masking on or off
    #[inline]
    #[must_use]
    pub fn with_masking(mut self, enabled: bool) -> Self {
        self.mask_sensitive_values = enabled;
        self
    }

    /// With collection batch cap
    #[inline]
    #[must_use]
    pub fn with_max_entities(mut self, max: usize) -> Self {
        self.max_entities_per_submission = max;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    ///
    /// [`OnboardingError::Config`] on malformed input or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, OnboardingError> {
        toml::from_str(content).map_err(|e| OnboardingError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// [`OnboardingError::Config`] when the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OnboardingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OnboardingError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(OnboardingConfig::from_toml_str("").unwrap(), OnboardingConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = OnboardingConfig::from_toml_str(
            r#"
            sync_legacy_flags = false

            [log]
            json = true
            "#,
        )
        .unwrap();
        assert!(!config.sync_legacy_flags);
        assert!(config.mask_sensitive_values);
        assert_eq!(config.max_entities_per_submission, 200);
        assert_eq!(config.log.filter, "info");
        assert!(config.log.json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = OnboardingConfig::from_toml_str("sync_flags = true").unwrap_err();
        assert!(matches!(err, OnboardingError::Config(_)));
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_entities_per_submission = 5").unwrap();
        let config = OnboardingConfig::load(file.path()).unwrap();
        assert_eq!(config, OnboardingConfig::new().with_max_entities(5));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnboardingConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
