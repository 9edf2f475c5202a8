//! Request orchestration from raw ABI entries to a compiled artifact

use crate::codegen::{AbiParser, ReactiveContractCodegen};
use crate::compiler::{Compiler, CompilerBackend};
use reactgen_core::config::ReactgenConfig;
use reactgen_core::types::{GeneratedArtifact, GeneratedSource, GenerationConfig, GenerationRequest, TopologyKind};
use reactgen_core::validation::resolve_binding;
use reactgen_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// End-to-end generator for `GenerationRequest`s
#[derive(Debug)]
pub struct Pipeline {
    parser: AbiParser,
    codegen: ReactiveContractCodegen,
    compiler: Compiler,
}

impl Pipeline {
    /// Pipeline backed by the configured `solc`
    pub fn new(config: &ReactgenConfig) -> Result<Self> {
        Ok(Self {
            parser: AbiParser::new(),
            codegen: ReactiveContractCodegen::new(config.generator.clone())?,
            compiler: Compiler::from_config(config),
        })
    }

    /// Pipeline compiling through an arbitrary backend
    pub fn with_backend(config: &ReactgenConfig, backend: Arc<dyn CompilerBackend>) -> Result<Self> {
        Ok(Self {
            parser: AbiParser::new(),
            codegen: ReactiveContractCodegen::new(config.generator.clone())?,
            compiler: Compiler::new(
                backend,
                config.compiler.clone(),
                config.generator.source_file_name.clone(),
            ),
        })
    }

    /// Introspect and resolve every binding of `request`
    pub fn build_config(&self, request: &GenerationRequest) -> Result<GenerationConfig> {
        let topology: TopologyKind = request.topology.parse()?;

        let bindings = request
            .bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                let event = self.parser.parse_event(&binding.event)?;
                let function = self.parser.parse_function(&binding.function)?;
                debug!(
                    binding = index,
                    event = %event.canonical_signature,
                    function = %function.canonical_signature,
                    "Resolving binding"
                );
                resolve_binding(&event, &function, &binding.input_mappings)
                    .map_err(|e| prefix_binding(index, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationConfig {
            topology,
            origin_chain_id: request.origin_chain_id,
            destination_chain_id: request.destination_chain_id,
            origin_addresses: request.origin_addresses.clone(),
            destination_address: request.destination_address.clone(),
            bindings,
            pausable: request.pausable,
            contract_name: request.contract_name.clone(),
        })
    }

    /// Emit source for `request` without compiling it
    pub fn generate(&self, request: &GenerationRequest) -> Result<GeneratedSource> {
        let config = self.build_config(request)?;
        self.codegen.emit(&config)
    }

    /// Emit and compile; validation failures never reach the backend
    pub async fn generate_and_compile(&self, request: &GenerationRequest) -> Result<GeneratedArtifact> {
        let source = self.generate(request)?;
        info!(contract = %source.contract_name, "Compiling generated contract");
        self.compiler
            .compile(&source.source_text, &source.contract_name)
            .await
    }
}

fn prefix_binding(index: usize, err: Error) -> Error {
    match err {
        Error::Validation { index: mapping, reason } => Error::Validation {
            index: mapping,
            reason: format!("binding {}: {}", index, reason),
        },
        other => other,
    }
}
