//! # Engine Configuration
//!
//! Settings that change how a ruleset resolves. Loaded from YAML; every
//! field has a default, so an empty document is a valid configuration.
//!
//! ```yaml
//! strict: false
//! platform: linux
//! guard_coverage: every_edge
//! default_symbol_priority: 10000
//! validate_symbols: true
//! ```

use std::path::Path;

use bindcfg_graph::{GuardCoverage, DEFAULT_SYMBOL_PRIORITY};
use bindcfg_parser::ParseMode;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fail on the first malformed line and treat unbroken cycles and
    /// ordering conflicts as errors. Required for release builds.
    pub strict: bool,
    /// Platform that `-class@platform` and `-function@platform` qualifiers
    /// are compared against.
    pub platform: String,
    /// How many guards a dependency cycle needs.
    pub guard_coverage: GuardCoverage,
    /// Priority of symbols no `+sort M: pattern=N` rule matches.
    pub default_symbol_priority: i64,
    /// Warn about rule targets absent from the introspected symbol table.
    pub validate_symbols: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            platform: host_platform().to_string(),
            guard_coverage: GuardCoverage::default(),
            default_symbol_priority: DEFAULT_SYMBOL_PRIORITY,
            validate_symbols: true,
        }
    }
}

impl EngineConfig {
    /// Strict configuration for release builds.
    pub fn release() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Same configuration for another platform.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Parser mode matching `strict`.
    pub fn parse_mode(&self) -> ParseMode {
        if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::Permissive
        }
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Config`] for malformed YAML, unknown fields or
    /// an empty platform.
    pub fn from_yaml_str(text: &str) -> PolicyResult<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| PolicyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Io`] if the file cannot be read and
    /// [`PolicyError::Yaml`] if it is not valid YAML for this structure.
    pub fn load(path: &Path) -> PolicyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&text).map_err(|source| PolicyError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), strict = config.strict, platform = %config.platform, "engine configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> PolicyResult<()> {
        if self.platform.trim().is_empty() {
            return Err(PolicyError::Config("platform must not be empty".into()));
        }
        Ok(())
    }
}

/// The running host in the platform spelling rule files use (`win32`,
/// `darwin`, `linux`).
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.strict);
        assert_eq!(config.guard_coverage, GuardCoverage::EveryEdge);
        assert_eq!(config.default_symbol_priority, 10_000);
        assert!(config.validate_symbols);
        assert_eq!(config.platform, host_platform());
    }

    #[test]
    fn test_release_is_strict() {
        let config = EngineConfig::release();
        assert!(config.strict);
        assert_eq!(config.parse_mode(), ParseMode::Strict);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("platform: win32\nguard_coverage: any_edge\n").unwrap();
        assert_eq!(config.platform, "win32");
        assert_eq!(config.guard_coverage, GuardCoverage::AnyEdge);
        assert!(!config.strict);
        assert_eq!(config.default_symbol_priority, 10_000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_yaml_str("stric: true\n").unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_empty_platform_rejected() {
        let err = EngineConfig::from_yaml_str("platform: ''\n").unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict: true\nplatform: darwin").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.strict);
        assert_eq!(config.platform, "darwin");
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.yaml")).unwrap_err();
        assert!(matches!(err, PolicyError::Io { .. }));
    }
}
