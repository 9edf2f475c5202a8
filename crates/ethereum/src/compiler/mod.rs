//! Compilation of generated contracts
//!
//! Wraps the emitted source in a standard JSON request, hands it to a
//! `CompilerBackend` and turns the response into a `GeneratedArtifact`.

pub mod backend;
pub mod cache;
pub mod standard_json;

#[cfg(test)]
mod tests;

pub use backend::{CompilerBackend, SolcBackend};
pub use cache::CachedBackend;
pub use standard_json::{StandardJsonInput, StandardJsonOutput};

use reactgen_core::config::{CompilerConfig, ReactgenConfig};
use reactgen_core::types::GeneratedArtifact;
use reactgen_core::{CompilationDiagnostic, Error, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Compilation adapter
#[derive(Clone)]
pub struct Compiler {
    backend: Arc<dyn CompilerBackend>,
    config: CompilerConfig,
    source_file_name: String,
}

impl Compiler {
    pub fn new(
        backend: Arc<dyn CompilerBackend>,
        config: CompilerConfig,
        source_file_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            config,
            source_file_name: source_file_name.into(),
        }
    }

    /// `solc` backend from configuration, cached when enabled
    pub fn from_config(config: &ReactgenConfig) -> Self {
        let solc = SolcBackend::new(config.compiler.solc_path.clone());
        let backend: Arc<dyn CompilerBackend> = if config.compiler.cache {
            Arc::new(CachedBackend::with_capacity(solc, config.compiler.cache_capacity))
        } else {
            Arc::new(solc)
        };

        Self::new(
            backend,
            config.compiler.clone(),
            config.generator.source_file_name.clone(),
        )
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `source_text` and extract `contract_name`.
    ///
    /// Makes exactly one backend call bounded by the configured timeout.
    pub async fn compile(&self, source_text: &str, contract_name: &str) -> Result<GeneratedArtifact> {
        let input = StandardJsonInput::for_source(&self.source_file_name, source_text, &self.config);
        let timeout = self.config.timeout();

        debug!(
            contract = %contract_name,
            file = %self.source_file_name,
            timeout_ms = timeout.as_millis() as u64,
            "Compiling generated source"
        );

        let output = tokio::time::timeout(timeout, self.backend.compile(&input))
            .await
            .map_err(|_| {
                Error::external(format!(
                    "compiler backend timed out after {} ms",
                    timeout.as_millis()
                ))
            })??;

        let (errors, warnings): (Vec<CompilationDiagnostic>, Vec<CompilationDiagnostic>) =
            output.diagnostics().into_iter().partition(|d| d.is_error());

        if !errors.is_empty() {
            let err = Error::compilation(errors.into_iter().chain(warnings).collect());
            warn!(contract = %contract_name, error = %err, "Compilation rejected the generated source");
            return Err(err);
        }

        let contract = output
            .find_contract(contract_name)
            .filter(|c| c.bytecode().is_some());

        let Some(contract) = contract else {
            let available = output.deployable_contracts();
            error!(
                contract = %contract_name,
                available = ?available,
                "Generated contract missing from compiler output"
            );
            return Err(Error::ContractNotFound {
                contract: contract_name.to_string(),
                available,
            });
        };

        let bytecode = contract.bytecode().unwrap_or_default();
        let bytecode = if bytecode.starts_with("0x") {
            bytecode.to_string()
        } else {
            format!("0x{}", bytecode)
        };

        info!(
            contract = %contract_name,
            bytecode_bytes = (bytecode.len() - 2) / 2,
            warnings = warnings.len(),
            "Compiled generated contract"
        );

        Ok(GeneratedArtifact {
            source_text: source_text.to_string(),
            contract_name: contract_name.to_string(),
            compiled_abi: Some(contract.abi.clone()),
            compiled_bytecode: Some(bytecode),
            warnings,
        })
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("source_file_name", &self.source_file_name)
            .finish_non_exhaustive()
    }
}
