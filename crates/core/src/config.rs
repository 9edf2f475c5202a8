//! Configuration for source generation and compilation

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Main configuration for the generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactgenConfig {
    /// Source emission settings
    pub generator: GeneratorConfig,
    /// Compiler backend settings
    pub compiler: CompilerConfig,
}

/// Settings for the code emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Contract name used when a request does not name one
    pub default_contract_name: String,
    /// Version constraint emitted in the `pragma solidity` line
    pub solidity_pragma: String,
    /// SPDX license identifier
    pub license: String,
    /// Gas limit attached to every emitted callback
    pub callback_gas_limit: u64,
    /// Virtual file name the source is registered under
    pub source_file_name: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_contract_name: "ReactiveContract".to_string(),
            solidity_pragma: ">=0.8.0".to_string(),
            license: "UNLICENSED".to_string(),
            callback_gas_limit: 1_000_000,
            source_file_name: "Reactive.sol".to_string(),
        }
    }
}

/// Optimizer settings forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }
}

/// Settings for the compiler backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Path to a `solc` executable accepting `--standard-json`
    pub solc_path: String,
    /// Upper bound for a single compilation in milliseconds
    pub timeout_ms: u64,
    pub optimizer: OptimizerConfig,
    /// Target EVM version, backend default when unset
    pub evm_version: Option<String>,
    /// Cache compilation results by request hash
    pub cache: bool,
    /// Most compilations the cache keeps before evicting the least recently used
    pub cache_capacity: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solc_path: "solc".to_string(),
            timeout_ms: 30_000,
            optimizer: OptimizerConfig::default(),
            evm_version: None,
            cache: false,
            cache_capacity: 64,
        }
    }
}

impl CompilerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ReactgenConfig {
    /// Load configuration from a `.toml` or `.json` file, apply environment
    /// overrides and validate the result
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config: ReactgenConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };

        debug!(path = %path.display(), "loaded configuration file");

        config.apply_environment_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REACTGEN_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(solc_path) = lookup("REACTGEN_SOLC_PATH") {
            self.compiler.solc_path = solc_path;
        }

        if let Some(timeout) = lookup("REACTGEN_COMPILE_TIMEOUT_MS") {
            self.compiler.timeout_ms = timeout.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "REACTGEN_COMPILE_TIMEOUT_MS".to_string(),
                value: timeout.clone(),
            })?;
        }

        if let Some(gas_limit) = lookup("REACTGEN_CALLBACK_GAS_LIMIT") {
            self.generator.callback_gas_limit =
                gas_limit.parse().map_err(|_| ConfigError::InvalidOverride {
                    key: "REACTGEN_CALLBACK_GAS_LIMIT".to_string(),
                    value: gas_limit.clone(),
                })?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.generator.default_contract_name) {
            return Err(ConfigError::InvalidContractName(
                self.generator.default_contract_name.clone(),
            ));
        }

        if self.generator.callback_gas_limit == 0 {
            return Err(ConfigError::InvalidGasLimit);
        }

        if self.generator.source_file_name.trim().is_empty() {
            return Err(ConfigError::MissingSourceFileName);
        }

        if self.compiler.solc_path.trim().is_empty() {
            return Err(ConfigError::MissingSolcPath);
        }

        if self.compiler.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if self.compiler.cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity);
        }

        Ok(())
    }
}

/// Whether `name` is a valid Solidity identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("Failed to parse configuration file '{path}': {reason}")]
    Parse { path: String, reason: String },
    #[error("Unsupported configuration file format '{0}'. Supported formats: .toml, .json")]
    UnsupportedFormat(String),
    #[error("Invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
    #[error("Invalid contract name '{0}': must be a Solidity identifier")]
    InvalidContractName(String),
    #[error("Invalid callback gas limit: must be greater than 0")]
    InvalidGasLimit,
    #[error("Missing source file name")]
    MissingSourceFileName,
    #[error("Missing solc path")]
    MissingSolcPath,
    #[error("Invalid compile timeout: must be greater than 0")]
    InvalidTimeout,
    #[error("Invalid compile cache capacity: must be greater than 0")]
    InvalidCacheCapacity,
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err.to_string())
    }
}
