/// Reactive contract generation for EVM chains
///
/// ABI introspection and contract emission live in `codegen`, backend
/// integration in `compiler`; `Pipeline` ties both to a `GenerationRequest`.
pub mod codegen;
pub mod compiler;
mod pipeline;

pub use codegen::{AbiParser, ReactiveContractCodegen};
pub use compiler::{CachedBackend, Compiler, CompilerBackend, SolcBackend};
pub use pipeline::Pipeline;

pub use reactgen_core::{Error, Result};
