//! Ethereum ABI parser
//!
//! Parses contract ABI JSON into raw entries and derives the typed event and
//! function records the binding resolver and emitter work with.

use reactgen_core::types::{
    AbiEntry, AbiEntryKind, AbiParam, EventInfo, EventInput, FunctionInfo, FunctionInput,
    SolidityType, StateMutability,
};
use reactgen_core::{Error, Result};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use std::path::Path;

/// Ethereum ABI parser
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiParser;

impl AbiParser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Self
    }

    /// Parse an Ethereum ABI file
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<Vec<AbiEntry>> {
        let content = std::fs::read_to_string(file_path)?;
        self.parse_content(&content)
    }

    /// Parse Ethereum ABI from JSON content
    pub fn parse_content(&self, content: &str) -> Result<Vec<AbiEntry>> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| Error::invalid_abi(format!("ABI is not valid JSON: {}", e)))?;
        self.parse_value(&value)
    }

    /// Parse ABI from a JSON value
    pub fn parse_value(&self, value: &Value) -> Result<Vec<AbiEntry>> {
        let abi_array = value
            .as_array()
            .ok_or_else(|| Error::invalid_abi("ABI must be an array"))?;

        abi_array
            .iter()
            .enumerate()
            .map(|(position, item)| self.parse_entry(item, position))
            .collect()
    }

    /// Parse a single ABI entry
    pub fn parse_entry(&self, value: &Value, position: usize) -> Result<AbiEntry> {
        let item_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::invalid_abi(format!("entry {} has no type", position)))?;

        let kind = AbiEntryKind::parse(item_type).ok_or_else(|| {
            Error::invalid_abi(format!("entry {} has unrecognised type '{}'", position, item_type))
        })?;

        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let inputs = value
            .get("inputs")
            .and_then(|v| v.as_array())
            .map(|arr| Self::parse_parameters(arr, &name))
            .transpose()?
            .unwrap_or_default();

        let state_mutability = match kind {
            AbiEntryKind::Function
            | AbiEntryKind::Constructor
            | AbiEntryKind::Fallback
            | AbiEntryKind::Receive => Some(Self::parse_state_mutability(value, &name)?),
            AbiEntryKind::Event | AbiEntryKind::Error => None,
        };

        let anonymous = value
            .get("anonymous")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(AbiEntry {
            kind,
            name,
            inputs,
            state_mutability,
            anonymous,
        })
    }

    fn parse_state_mutability(value: &Value, name: &str) -> Result<StateMutability> {
        match value.get("stateMutability").and_then(|v| v.as_str()) {
            Some(raw) => StateMutability::parse(raw).ok_or_else(|| {
                Error::invalid_abi(format!("function '{}' has unknown stateMutability '{}'", name, raw))
            }),
            // Legacy support
            None => {
                if value.get("constant").and_then(|v| v.as_bool()).unwrap_or(false) {
                    Ok(StateMutability::View)
                } else if value.get("payable").and_then(|v| v.as_bool()).unwrap_or(false) {
                    Ok(StateMutability::Payable)
                } else {
                    Ok(StateMutability::Nonpayable)
                }
            }
        }
    }

    fn parse_parameters(array: &[Value], owner: &str) -> Result<Vec<AbiParam>> {
        array
            .iter()
            .map(|param| {
                let name = param
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();

                let param_type = param
                    .get("type")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        Error::invalid_abi(format!("parameter '{}' of '{}' has no type", name, owner))
                    })?
                    .to_string();

                let internal_type = param
                    .get("internalType")
                    .and_then(|v| v.as_str())
                    .map(String::from);

                let indexed = param
                    .get("indexed")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);

                Ok(AbiParam {
                    name,
                    param_type,
                    indexed,
                    internal_type,
                })
            })
            .collect()
    }

    /// Parse a standalone event entry, e.g. from a generation request
    pub fn parse_event(&self, value: &Value) -> Result<EventInfo> {
        let entry = self.parse_entry(value, 0)?;
        if entry.kind != AbiEntryKind::Event {
            return Err(Error::invalid_abi(format!(
                "expected an event entry, found {:?} '{}'",
                entry.kind, entry.name
            )));
        }
        event_info(&entry)
    }

    /// Parse a standalone function entry, e.g. from a generation request.
    ///
    /// View and pure functions are rejected: they cannot be callback targets.
    pub fn parse_function(&self, value: &Value) -> Result<FunctionInfo> {
        let entry = self.parse_entry(value, 0)?;
        if entry.kind != AbiEntryKind::Function {
            return Err(Error::invalid_abi(format!(
                "expected a function entry, found {:?} '{}'",
                entry.kind, entry.name
            )));
        }
        if is_read_only(&entry) {
            return Err(Error::validation(format!(
                "function '{}' is {} and cannot be a callback target",
                entry.name,
                entry.state_mutability.unwrap_or(StateMutability::View)
            )));
        }
        function_info(&entry)
    }

    /// Get human-readable function signature
    pub fn get_function_signature(&self, function: &FunctionInfo) -> String {
        let input_types: Vec<String> = function
            .inputs
            .iter()
            .map(|param| {
                if param.name.is_empty() {
                    param.ty.to_string()
                } else {
                    format!("{} {}", param.ty, param.name)
                }
            })
            .collect();

        format!("function {}({})", function.name, input_types.join(", "))
    }
}

/// Events in declaration order.
///
/// The returned order becomes the dispatch order of the emitted contract.
pub fn extract_events(abi: &[AbiEntry]) -> Result<Vec<EventInfo>> {
    abi.iter()
        .filter(|entry| entry.kind == AbiEntryKind::Event)
        .map(event_info)
        .collect()
}

/// State-changing functions in declaration order; view and pure are skipped
pub fn extract_functions(abi: &[AbiEntry]) -> Result<Vec<FunctionInfo>> {
    abi.iter()
        .filter(|entry| entry.kind == AbiEntryKind::Function && !is_read_only(entry))
        .map(function_info)
        .collect()
}

/// Find an event by name
pub fn find_event<'a>(events: &'a [EventInfo], name: &str) -> Option<&'a EventInfo> {
    events.iter().find(|event| event.name == name)
}

/// Find a function by name
pub fn find_function<'a>(functions: &'a [FunctionInfo], name: &str) -> Option<&'a FunctionInfo> {
    functions.iter().find(|function| function.name == name)
}

fn is_read_only(entry: &AbiEntry) -> bool {
    entry
        .state_mutability
        .map(|m| m.is_read_only())
        .unwrap_or(false)
}

fn event_info(entry: &AbiEntry) -> Result<EventInfo> {
    if entry.name.is_empty() {
        return Err(Error::invalid_abi("event without a name"));
    }
    if entry.anonymous {
        return Err(Error::invalid_abi(format!(
            "event '{}' is anonymous and has no topic0",
            entry.name
        )));
    }

    let inputs = entry
        .inputs
        .iter()
        .enumerate()
        .map(|(position, param)| {
            Ok(EventInput {
                name: param.name.clone(),
                ty: parse_type(&entry.name, param)?,
                indexed: param.indexed,
                position,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let canonical_signature =
        canonical_signature(&entry.name, inputs.iter().map(|input| &input.ty));
    let topic0 = topic0(&canonical_signature);

    Ok(EventInfo {
        name: entry.name.clone(),
        inputs,
        canonical_signature,
        topic0,
    })
}

fn function_info(entry: &AbiEntry) -> Result<FunctionInfo> {
    if entry.name.is_empty() {
        return Err(Error::invalid_abi("function without a name"));
    }

    let inputs = entry
        .inputs
        .iter()
        .map(|param| {
            Ok(FunctionInput {
                name: param.name.clone(),
                ty: parse_type(&entry.name, param)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let canonical_signature =
        canonical_signature(&entry.name, inputs.iter().map(|input| &input.ty));
    let selector = selector(&canonical_signature);

    Ok(FunctionInfo {
        name: entry.name.clone(),
        inputs,
        canonical_signature,
        selector,
        state_mutability: entry
            .state_mutability
            .unwrap_or(StateMutability::Nonpayable),
    })
}

fn parse_type(owner: &str, param: &AbiParam) -> Result<SolidityType> {
    param.param_type.parse().map_err(|e: Error| {
        Error::invalid_abi(format!("'{}' parameter '{}': {}", owner, param.name, e))
    })
}

/// `name(type1,type2,...)` with types only
pub fn canonical_signature<'a, I>(name: &str, types: I) -> String
where
    I: IntoIterator<Item = &'a SolidityType>,
{
    let types: Vec<String> = types.into_iter().map(|ty| ty.to_string()).collect();
    format!("{}({})", name, types.join(","))
}

/// Keccak-256 of the signature, `0x`-prefixed lowercase hex
pub fn topic0(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// First four bytes of the signature hash, `0x`-prefixed
pub fn selector(signature: &str) -> String {
    format!("0x{}", hex::encode(&keccak256(signature.as_bytes())[..4]))
}

pub(crate) fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}
