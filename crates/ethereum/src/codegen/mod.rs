//! Code generation for reactive contracts
//!
//! This module introspects contract ABIs, selects the subscription topology and
//! emits a Solidity contract that relays origin-chain events as callbacks to a
//! destination contract.

pub mod generator;
pub mod parser;
pub mod solidity;
pub mod strategy;
pub mod templates;


pub use generator::ReactiveContractCodegen;
pub use parser::AbiParser;
pub use strategy::{select_strategy, OriginCriterion, Strategy};

use reactgen_core::config::GeneratorConfig;
use reactgen_core::types::{GeneratedSource, GenerationConfig};
use reactgen_core::Result;

/// Emit the source for `config` with a one-off generator
pub fn generate_contract_source(
    config: &GenerationConfig,
    generator_config: GeneratorConfig,
) -> Result<GeneratedSource> {
    let codegen = ReactiveContractCodegen::new(generator_config)?;
    codegen.emit(config)
}
