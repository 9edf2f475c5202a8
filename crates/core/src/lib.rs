/// Core types, configuration and binding resolution
pub mod types;
pub mod config;
pub mod validation;

/// Re-export common types from reactgen-common
pub use reactgen_common::{CompilationDiagnostic, Error, Result, Severity};
