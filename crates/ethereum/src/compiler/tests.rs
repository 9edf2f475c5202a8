use super::standard_json::{Bytecode, ContractOutput, EvmOutput, OutputError};
use super::*;
use async_trait::async_trait;
use reactgen_core::Severity;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const FILE: &str = "Reactive.sol";

/// Backend returning a canned response and counting calls
#[derive(Clone)]
struct StubBackend {
    response: std::result::Result<StandardJsonOutput, String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubBackend {
    fn returning(output: StandardJsonOutput) -> Self {
        Self {
            response: Ok(output),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompilerBackend for StubBackend {
    async fn compile(&self, _input: &StandardJsonInput) -> Result<StandardJsonOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone().map_err(Error::external)
    }
}

fn contract(bytecode: &str) -> ContractOutput {
    ContractOutput {
        abi: json!([{"type": "function", "name": "react", "inputs": [], "outputs": [], "stateMutability": "nonpayable"}]),
        evm: Some(EvmOutput {
            bytecode: Some(Bytecode {
                object: bytecode.to_string(),
            }),
        }),
    }
}

fn output(contracts: &[(&str, &str)], errors: Vec<OutputError>) -> StandardJsonOutput {
    let mut file = BTreeMap::new();
    for (name, bytecode) in contracts {
        file.insert(name.to_string(), contract(bytecode));
    }
    let mut all = BTreeMap::new();
    all.insert(FILE.to_string(), file);
    StandardJsonOutput {
        contracts: all,
        errors,
    }
}

fn diagnostic(severity: &str, message: &str) -> OutputError {
    OutputError {
        severity: severity.to_string(),
        message: message.to_string(),
        formatted_message: None,
        source_location: None,
        error_type: None,
    }
}

fn compiler(backend: Arc<dyn CompilerBackend>) -> Compiler {
    Compiler::new(backend, CompilerConfig::default(), FILE)
}

#[tokio::test]
async fn test_successful_compilation() {
    let backend = StubBackend::returning(output(
        &[("IReactive", ""), ("Relay", "6080604052")],
        vec![diagnostic("warning", "Unused local variable.")],
    ));
    let artifact = compiler(Arc::new(backend.clone()))
        .compile("contract Relay {}", "Relay")
        .await
        .unwrap();

    assert!(artifact.is_compiled());
    assert_eq!(artifact.compiled_bytecode.as_deref(), Some("0x6080604052"));
    assert!(artifact.compiled_abi.as_ref().unwrap().as_array().is_some_and(|a| !a.is_empty()));
    assert_eq!(artifact.source_text, "contract Relay {}");
    assert_eq!(artifact.warnings.len(), 1);
    assert_eq!(artifact.warnings[0].severity, Severity::Warning);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_error_diagnostics_fail_compilation() {
    let backend = StubBackend::returning(output(
        &[],
        vec![
            diagnostic("warning", "Unreachable code."),
            diagnostic("error", "Undeclared identifier."),
            diagnostic("error", "Type uint256 is not implicitly convertible."),
        ],
    ));

    let err = compiler(Arc::new(backend))
        .compile("contract Relay {}", "Relay")
        .await
        .unwrap_err();

    match &err {
        Error::Compilation { message, diagnostics } => {
            assert_eq!(message, "Undeclared identifier.");
            assert_eq!(diagnostics.len(), 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.diagnostics().len(), 3);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_missing_contract_is_reported() {
    let backend = StubBackend::returning(output(&[("Other", "6080"), ("IReactive", "")], vec![]));

    let err = compiler(Arc::new(backend))
        .compile("contract Other {}", "Relay")
        .await
        .unwrap_err();

    match err {
        Error::ContractNotFound { contract, available } => {
            assert_eq!(contract, "Relay");
            assert_eq!(available, vec!["Other".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_contract_without_bytecode_is_not_found() {
    let backend = StubBackend::returning(output(&[("Relay", "")], vec![]));

    let err = compiler(Arc::new(backend))
        .compile("abstract contract Relay {}", "Relay")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ContractNotFound { .. }));
}

#[tokio::test]
async fn test_backend_failure_is_retryable() {
    let backend = StubBackend::failing("solc: command not found");

    let err = compiler(Arc::new(backend))
        .compile("contract Relay {}", "Relay")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalService(_)));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_maps_to_external_service() {
    let backend = StubBackend::returning(output(&[("Relay", "6080")], vec![]))
        .with_delay(Duration::from_secs(60));
    let config = CompilerConfig {
        timeout_ms: 50,
        ..CompilerConfig::default()
    };

    let err = Compiler::new(Arc::new(backend), config, FILE)
        .compile("contract Relay {}", "Relay")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExternalService(ref msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_cache_single_flight() {
    let stub = StubBackend::returning(output(&[("Relay", "6080")], vec![]))
        .with_delay(Duration::from_millis(20));
    let cached = Arc::new(CachedBackend::new(stub.clone()));
    let compiler = compiler(cached.clone());

    let (a, b, c) = tokio::join!(
        compiler.compile("contract Relay {}", "Relay"),
        compiler.compile("contract Relay {}", "Relay"),
        compiler.compile("contract Relay {}", "Relay"),
    );
    assert_eq!(a.unwrap().compiled_bytecode, b.unwrap().compiled_bytecode);
    assert!(c.is_ok());
    assert_eq!(stub.calls(), 1);

    compiler.compile("contract Relay { }", "Relay").await.unwrap();
    assert_eq!(stub.calls(), 2);
    assert_eq!(cached.len().await, 2);

    cached.clear().await;
    assert!(cached.is_empty().await);
}

#[tokio::test]
async fn test_cache_does_not_keep_failures() {
    let stub = StubBackend::failing("connection reset");
    let compiler = compiler(Arc::new(CachedBackend::new(stub.clone())));

    assert!(compiler.compile("contract Relay {}", "Relay").await.is_err());
    assert!(compiler.compile("contract Relay {}", "Relay").await.is_err());
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn test_failed_compilations_release_their_slots() {
    let stub = StubBackend::failing("connection reset");
    let cached = Arc::new(CachedBackend::new(stub.clone()));
    let compiler = compiler(cached.clone());

    for i in 0..100 {
        let source = format!("contract Relay{} {{}}", i);
        assert!(compiler.compile(&source, "Relay").await.is_err());
    }
    assert_eq!(stub.calls(), 100);
    assert!(cached.is_empty().await);
}

#[tokio::test]
async fn test_cache_evicts_least_recently_used() {
    let stub = StubBackend::returning(output(&[("Relay", "6080")], vec![]));
    let cached = Arc::new(CachedBackend::with_capacity(stub.clone(), 2));
    let compiler = compiler(cached.clone());

    compiler.compile("contract A {}", "Relay").await.unwrap();
    compiler.compile("contract B {}", "Relay").await.unwrap();
    compiler.compile("contract A {}", "Relay").await.unwrap();
    assert_eq!(stub.calls(), 2);

    // B is the least recently used entry
    compiler.compile("contract C {}", "Relay").await.unwrap();
    assert_eq!(stub.calls(), 3);
    assert_eq!(cached.len().await, 2);

    compiler.compile("contract A {}", "Relay").await.unwrap();
    compiler.compile("contract C {}", "Relay").await.unwrap();
    assert_eq!(stub.calls(), 3);

    compiler.compile("contract B {}", "Relay").await.unwrap();
    assert_eq!(stub.calls(), 4);
    assert_eq!(cached.len().await, 2);
}

#[test]
fn test_from_config_honours_cache_capacity() {
    let mut config = ReactgenConfig::default();
    config.compiler.cache = true;
    config.compiler.cache_capacity = 8;
    let compiler = Compiler::from_config(&config);
    assert_eq!(compiler.config().cache_capacity, 8);
}

#[tokio::test]
#[ignore = "requires solc on PATH; run with --ignored"]
async fn test_two_binding_contract_compiles_with_solc() {
    use crate::codegen::parser::{extract_events, extract_functions};
    use crate::codegen::{AbiParser, ReactiveContractCodegen};
    use reactgen_core::config::GeneratorConfig;
    use reactgen_core::types::{GenerationConfig, InputMapping, TopologyKind};
    use reactgen_core::validation::resolve_binding;

    let parser = AbiParser::new();
    let events = extract_events(
        &parser
            .parse_content(
                r#"[
                {"type":"event","name":"Deposit","inputs":[
                    {"name":"user","type":"address","indexed":true},
                    {"name":"amount","type":"uint256","indexed":false}]},
                {"type":"event","name":"Paused","inputs":[
                    {"name":"by","type":"address","indexed":true},
                    {"name":"reason","type":"string","indexed":false},
                    {"name":"flag","type":"bool","indexed":false}]}
            ]"#,
            )
            .unwrap(),
    )
    .unwrap();
    let functions = extract_functions(
        &parser
            .parse_content(
                r#"[
                {"type":"function","name":"credit","stateMutability":"nonpayable","inputs":[
                    {"name":"sender","type":"address"},
                    {"name":"user","type":"address"},
                    {"name":"amount","type":"uint256"}]},
                {"type":"function","name":"halt","stateMutability":"nonpayable","inputs":[
                    {"name":"by","type":"address"},
                    {"name":"reason","type":"string"}]}
            ]"#,
            )
            .unwrap(),
    )
    .unwrap();

    let deposit = resolve_binding(
        &events[0],
        &functions[0],
        &[
            InputMapping::unbound("sender", "address"),
            InputMapping::topic("user", "address", 1),
            InputMapping::data_field("amount", "uint256", "amount"),
        ],
    )
    .unwrap();
    let paused = resolve_binding(
        &events[1],
        &functions[1],
        &[
            InputMapping::topic("by", "address", 1),
            InputMapping::data_field("reason", "string", "reason"),
        ],
    )
    .unwrap();

    let config = GenerationConfig {
        topology: TopologyKind::ProtocolToProtocol,
        origin_chain_id: 11155111,
        destination_chain_id: 11155111,
        origin_addresses: vec![
            "0x1111111111111111111111111111111111111111".to_string(),
            "0x2222222222222222222222222222222222222222".to_string(),
        ],
        destination_address: "0x3333333333333333333333333333333333333333".to_string(),
        bindings: vec![deposit, paused],
        pausable: true,
        contract_name: Some("VaultRelay".to_string()),
    };

    let source = ReactiveContractCodegen::new(GeneratorConfig::default())
        .unwrap()
        .emit(&config)
        .unwrap();

    let compiler = Compiler::from_config(&ReactgenConfig::default());
    let artifact = compiler
        .compile(&source.source_text, &source.contract_name)
        .await
        .unwrap();

    assert!(artifact
        .compiled_abi
        .as_ref()
        .and_then(|abi| abi.as_array())
        .is_some_and(|abi| !abi.is_empty()));
    assert!(artifact.compiled_bytecode.as_ref().is_some_and(|b| b.len() > 2));
}
