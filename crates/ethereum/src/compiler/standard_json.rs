//! Solidity standard JSON request and response types

use reactgen_core::config::CompilerConfig;
use reactgen_core::{CompilationDiagnostic, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Compile request sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardJsonInput {
    pub language: String,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub output_selection: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<Optimizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimizer {
    pub enabled: bool,
    pub runs: u32,
}

impl StandardJsonInput {
    /// Single-file request asking for ABI and creation bytecode only
    pub fn for_source(file_name: &str, source_text: &str, config: &CompilerConfig) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            file_name.to_string(),
            SourceContent {
                content: source_text.to_string(),
            },
        );

        Self {
            language: "Solidity".to_string(),
            sources,
            settings: Settings {
                output_selection: json!({ "*": { "*": ["abi", "evm.bytecode.object"] } }),
                optimizer: Some(Optimizer {
                    enabled: config.optimizer.enabled,
                    runs: config.optimizer.runs,
                }),
                evm_version: config.evm_version.clone(),
            },
        }
    }
}

/// Backend response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardJsonOutput {
    /// `contracts[file][name]`
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, ContractOutput>>,
    #[serde(default)]
    pub errors: Vec<OutputError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractOutput {
    #[serde(default)]
    pub abi: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm: Option<EvmOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvmOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<Bytecode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    #[serde(default)]
    pub object: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputError {
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start: i64,
    pub end: i64,
}

impl OutputError {
    pub fn to_diagnostic(&self) -> CompilationDiagnostic {
        let message = match &self.error_type {
            Some(kind) if !self.message.starts_with(kind.as_str()) => {
                format!("{}: {}", kind, self.message)
            }
            _ => self.message.clone(),
        };

        CompilationDiagnostic {
            severity: Severity::from(self.severity.as_str()),
            message,
            location: self
                .source_location
                .as_ref()
                .map(|l| format!("{}:{}-{}", l.file, l.start, l.end)),
        }
    }
}

impl ContractOutput {
    /// Creation bytecode, if the backend produced any
    pub fn bytecode(&self) -> Option<&str> {
        self.evm
            .as_ref()
            .and_then(|evm| evm.bytecode.as_ref())
            .map(|b| b.object.as_str())
            .filter(|object| !object.is_empty())
    }
}

impl StandardJsonOutput {
    pub fn diagnostics(&self) -> Vec<CompilationDiagnostic> {
        self.errors.iter().map(OutputError::to_diagnostic).collect()
    }

    /// Look a contract up by name across every source file
    pub fn find_contract(&self, name: &str) -> Option<&ContractOutput> {
        self.contracts.values().find_map(|contracts| contracts.get(name))
    }

    /// Names of contracts with non-empty bytecode, sorted
    pub fn deployable_contracts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .contracts
            .values()
            .flat_map(|contracts| contracts.iter())
            .filter(|(_, output)| output.bytecode().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let input = StandardJsonInput::for_source("Reactive.sol", "contract A {}", &CompilerConfig::default());
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(value["language"], "Solidity");
        assert_eq!(value["sources"]["Reactive.sol"]["content"], "contract A {}");
        assert_eq!(
            value["settings"]["outputSelection"]["*"]["*"],
            json!(["abi", "evm.bytecode.object"])
        );
        assert_eq!(value["settings"]["optimizer"]["runs"], 200);
        assert!(value["settings"].get("evmVersion").is_none());
    }

    #[test]
    fn test_parse_solc_response() {
        let raw = r#"{
            "contracts": {
                "Reactive.sol": {
                    "IReactive": {"abi": [], "evm": {"bytecode": {"object": ""}}},
                    "Relay": {"abi": [{"type": "constructor", "inputs": []}], "evm": {"bytecode": {"object": "6080"}}}
                }
            },
            "errors": [{
                "severity": "warning",
                "type": "Warning",
                "component": "general",
                "message": "Unused local variable.",
                "formattedMessage": "Warning: Unused local variable.",
                "sourceLocation": {"file": "Reactive.sol", "start": 10, "end": 20}
            }],
            "sources": {"Reactive.sol": {"id": 0}}
        }"#;

        let output: StandardJsonOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(output.deployable_contracts(), vec!["Relay".to_string()]);
        assert_eq!(output.find_contract("Relay").unwrap().bytecode(), Some("6080"));
        assert_eq!(output.find_contract("IReactive").unwrap().bytecode(), None);

        let diagnostics = output.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].message, "Warning: Unused local variable.");
        assert_eq!(diagnostics[0].location.as_deref(), Some("Reactive.sol:10-20"));
    }
}
