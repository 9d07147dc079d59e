//! Configuration for ruleinf
//!
//! Settings come from a TOML file, then environment variables override
//! individual keys.
//!
//! # Configuration File Locations
//!
//! Searched in order (first found wins):
//! 1. `./ruleinf.toml` - Project-local configuration
//! 2. `~/.config/ruleinf/config.toml` - User configuration (XDG)
//! 3. `~/.ruleinf/config.toml` - User configuration (legacy)
//! 4. `/etc/ruleinf/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `RULEINF_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `RULEINF_MAX_STEPS` - Step budget per propagation run or query
//! - `RULEINF_DERIVATIONS` - Record derivations (true/false)
//! - `RULEINF_TRACE` - Log every rule firing (true/false)
//! - `RULEINF_TABLE_ALL` - Table every backward goal (true/false)
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "normal"
//!
//! [reasoning]
//! derivation_logging = false
//! trace = false
//! table_all = false
//! max_steps = 1000000
//! hide_functor_triples = true
//!
//! [prefixes]
//! ex = "http://example.org/"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Engine settings
    pub reasoning: ReasoningConfig,
    /// Extra prefixes for rule text and printing
    pub prefixes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: LogLevel,
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Record a derivation for every rule conclusion
    pub derivation_logging: bool,
    /// Log each rule firing at debug level
    pub trace: bool,
    /// Table every backward goal, not just declared predicates
    pub table_all: bool,
    /// Firings per forward run, or tasks per backward query (0 = unlimited)
    pub max_steps: usize,
    /// Leave triples with a functor object out of query results
    pub hide_functor_triples: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            derivation_logging: false,
            trace: false,
            table_all: false,
            max_steps: 1_000_000,
            hide_functor_triples: true,
        }
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn",
            LogLevel::Verbose => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Raise the level by `count` steps, as repeated `-v` flags do
    pub fn raised(self, count: u8) -> Self {
        let mut level = self;
        for _ in 0..count {
            level = match level {
                LogLevel::Quiet => LogLevel::Normal,
                LogLevel::Normal => LogLevel::Verbose,
                LogLevel::Verbose | LogLevel::Debug => LogLevel::Debug,
            };
        }
        level
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = Self::config_paths().into_iter().find(|p| p.exists()) {
            config = Self::load_from_file(&path)?;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(PathBuf::from("<string>"), e.to_string()))
    }

    /// Config file search paths, most specific first
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./ruleinf.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ruleinf").join("config.toml"));
        }
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".ruleinf").join("config.toml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/ruleinf/config.toml"));
        paths
    }

    /// Apply `RULEINF_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("RULEINF_LOG_LEVEL").as_deref().and_then(LogLevel::from_str) {
            self.general.log_level = level;
        }
        if let Some(steps) = lookup("RULEINF_MAX_STEPS").and_then(|v| v.parse::<usize>().ok()) {
            self.reasoning.max_steps = steps;
        }
        if let Some(val) = lookup("RULEINF_DERIVATIONS") {
            self.reasoning.derivation_logging = parse_flag(&val);
        }
        if let Some(val) = lookup("RULEINF_TRACE") {
            self.reasoning.trace = parse_flag(&val);
        }
        if let Some(val) = lookup("RULEINF_TABLE_ALL") {
            self.reasoning.table_all = parse_flag(&val);
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Commented default configuration file
    pub fn default_config_content() -> &'static str {
        r#"# ruleinf configuration

[general]
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

[reasoning]
# Record derivations for every rule conclusion (needed by `why`)
derivation_logging = false
# Log each rule firing at debug level
trace = false
# Table every backward goal instead of only declared predicates
table_all = false
# Firings per forward run, tasks per backward query (0 = unlimited)
max_steps = 1000000
# Leave triples with functor objects out of query results
hide_functor_triples = true

[prefixes]
# ex = "http://example.org/"
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {1}", path = .0.display())]
    Io(PathBuf, String),
    #[error("Parse error in {path}: {1}", path = .0.display())]
    Parse(PathBuf, String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<ConfigError> for crate::error::RuleError {
    fn from(err: ConfigError) -> Self {
        let code = match err {
            ConfigError::Parse(..) => crate::error::ErrorCode::InvalidConfigSyntax,
            _ => crate::error::ErrorCode::ConfigError,
        };
        crate::error::RuleError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new();
        assert_eq!(config.reasoning.max_steps, 1_000_000);
        assert!(config.reasoning.hide_functor_triples);
        assert!(!config.reasoning.derivation_logging);
        assert_eq!(config.general.log_level, LogLevel::Normal);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            log_level = "verbose"

            [reasoning]
            max_steps = 500
            table_all = true

            [prefixes]
            ex = "http://example.org/"
        "#;
        let config = EngineConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.reasoning.max_steps, 500);
        assert!(config.reasoning.table_all);
        assert!(config.reasoning.hide_functor_triples);
        assert_eq!(config.prefixes.get("ex").map(String::as_str), Some("http://example.org/"));
    }

    #[test]
    fn test_invalid_config() {
        let err = EngineConfig::load_from_str("[reasoning]\nmax_steps = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        let rule_err: crate::error::RuleError = err.into();
        assert_eq!(rule_err.code, crate::error::ErrorCode::InvalidConfigSyntax);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RULEINF_MAX_STEPS", "42"),
            ("RULEINF_DERIVATIONS", "yes"),
            ("RULEINF_LOG_LEVEL", "debug"),
            ("RULEINF_TRACE", "nonsense"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::new();
        config.reasoning.trace = true;
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.reasoning.max_steps, 42);
        assert!(config.reasoning.derivation_logging);
        assert!(!config.reasoning.trace);
        assert_eq!(config.general.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::from_str("v"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Normal.raised(1), LogLevel::Verbose);
        assert_eq!(LogLevel::Normal.raised(5), LogLevel::Debug);
        assert_eq!(LogLevel::Quiet.filter(), "error");
    }

    #[test]
    fn test_default_content_round_trips() {
        let config = EngineConfig::load_from_str(EngineConfig::default_config_content()).unwrap();
        assert_eq!(config, EngineConfig::default());
        let again = EngineConfig::load_from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_config_paths() {
        let paths = EngineConfig::config_paths();
        assert!(paths[0].ends_with("ruleinf.toml"));
    }
}
