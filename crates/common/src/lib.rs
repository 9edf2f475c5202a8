/// Common types and utilities for the reactive contract generator
use serde::{Deserialize, Serialize};

/// Severity of a compiler diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks artifact production
    Error,

    /// Reported alongside the artifact
    Warning,

    /// Informational note from the backend
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// A single diagnostic reported by the compiler backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationDiagnostic {
    pub severity: Severity,
    pub message: String,
    /// `file:start-end` when the backend reports a source location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CompilationDiagnostic {
    /// Whether this diagnostic blocks artifact production
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for CompilationDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}: {}", self.severity, location, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Error type for generation and compilation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unsupported ABI entry
    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    /// Rejected input mapping or generation config
    #[error("Validation failed{}: {reason}", .index.map(|i| format!(" for mapping {}", i)).unwrap_or_default())]
    Validation {
        /// Offending mapping index, when the failure is tied to one
        index: Option<usize>,
        reason: String,
    },

    /// Topology value outside the supported set
    #[error("Unsupported topology: {0}")]
    UnsupportedTopology(String),

    /// Compiler backend unreachable, failed or timed out
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Backend returned error-severity diagnostics
    #[error("Compilation failed: {message}")]
    Compilation {
        /// First error message
        message: String,
        diagnostics: Vec<CompilationDiagnostic>,
    },

    /// Compiler output lacks the contract the emitter named
    #[error("Contract '{contract}' not found in compiler output (available: {})", .available.join(", "))]
    ContractNotFound {
        contract: String,
        available: Vec<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template registration or rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// Any other error with its source
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new invalid ABI error
    pub fn invalid_abi<S: Into<String>>(msg: S) -> Self {
        Error::InvalidAbi(msg.into())
    }

    /// Create a validation error tied to a mapping index
    pub fn mapping<S: Into<String>>(index: usize, reason: S) -> Self {
        Error::Validation {
            index: Some(index),
            reason: reason.into(),
        }
    }

    /// Create a validation error not tied to a single mapping
    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Error::Validation {
            index: None,
            reason: reason.into(),
        }
    }

    /// Create a new external service error
    pub fn external<S: Into<String>>(msg: S) -> Self {
        Error::ExternalService(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Error::Template(msg.into())
    }

    /// Create a compilation error from the backend diagnostics.
    ///
    /// The first error-severity message becomes the primary failure reason.
    pub fn compilation(diagnostics: Vec<CompilationDiagnostic>) -> Self {
        let message = diagnostics
            .iter()
            .find(|d| d.is_error())
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "compiler reported errors".to_string());
        Error::Compilation { message, diagnostics }
    }

    /// Only backend failures are worth retrying; everything else is deterministic
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ExternalService(_))
    }

    /// Full diagnostic list for compilation failures
    pub fn diagnostics(&self) -> &[CompilationDiagnostic] {
        match self {
            Error::Compilation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
