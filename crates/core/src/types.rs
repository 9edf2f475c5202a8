//! Data model shared by the ABI introspector, binding resolver, code emitter
//! and compilation adapter.

use ethabi::param_type::Reader;
use ethabi::ParamType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{CompilationDiagnostic, Error, Result};

/// Kind of a raw ABI entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiEntryKind {
    Function,
    Event,
    Constructor,
    Fallback,
    Receive,
    Error,
}

impl AbiEntryKind {
    /// Parse the `type` field of an ABI entry
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "function" => Some(AbiEntryKind::Function),
            "event" => Some(AbiEntryKind::Event),
            "constructor" => Some(AbiEntryKind::Constructor),
            "fallback" => Some(AbiEntryKind::Fallback),
            "receive" => Some(AbiEntryKind::Receive),
            "error" => Some(AbiEntryKind::Error),
            _ => None,
        }
    }
}

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pure" => Some(StateMutability::Pure),
            "view" => Some(StateMutability::View),
            "nonpayable" => Some(StateMutability::Nonpayable),
            "payable" => Some(StateMutability::Payable),
            _ => None,
        }
    }

    /// View and pure functions cannot have side effects
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMutability::Pure => write!(f, "pure"),
            StateMutability::View => write!(f, "view"),
            StateMutability::Nonpayable => write!(f, "nonpayable"),
            StateMutability::Payable => write!(f, "payable"),
        }
    }
}

/// Raw ABI parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    /// Parameter name, empty when the ABI omits it
    pub name: String,
    /// Type string as written in the ABI (e.g. `uint256`, `address`)
    #[serde(rename = "type")]
    pub param_type: String,
    /// Whether the parameter is indexed (events only)
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, rename = "internalType", skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

/// One element of a raw ABI array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: AbiEntryKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// Present for functions; legacy ABIs are normalised by the parser
    #[serde(default, rename = "stateMutability", skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
    #[serde(default)]
    pub anonymous: bool,
}

/// Elementary Solidity types the generator can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolidityType {
    Address,
    Bool,
    String,
    Bytes,
    /// `uint<bits>`, bits in 8..=256 step 8
    Uint(u16),
    /// `int<bits>`, bits in 8..=256 step 8
    Int(u16),
    /// `bytes<len>`, len in 1..=32
    FixedBytes(u8),
}

fn valid_bits(bits: usize) -> bool {
    bits >= 8 && bits <= 256 && bits % 8 == 0
}

impl SolidityType {
    /// Map an ethabi parameter type onto a supported elementary type.
    ///
    /// Arrays, tuples and out-of-range sizes yield `None`.
    pub fn from_param(param: &ParamType) -> Option<Self> {
        match param {
            ParamType::Address => Some(SolidityType::Address),
            ParamType::Bool => Some(SolidityType::Bool),
            ParamType::String => Some(SolidityType::String),
            ParamType::Bytes => Some(SolidityType::Bytes),
            ParamType::Uint(bits) if valid_bits(*bits) => Some(SolidityType::Uint(*bits as u16)),
            ParamType::Int(bits) if valid_bits(*bits) => Some(SolidityType::Int(*bits as u16)),
            ParamType::FixedBytes(len) if (1..=32).contains(len) => {
                Some(SolidityType::FixedBytes(*len as u8))
            }
            _ => None,
        }
    }

    /// Whether a value of this type fits in a single 32-byte topic word.
    ///
    /// Indexed dynamic values are stored as their hash, so string and bytes
    /// can never be recovered from a topic.
    pub fn is_word(&self) -> bool {
        !matches!(self, SolidityType::String | SolidityType::Bytes)
    }

    /// Canonical zero literal used for unbound parameters
    pub fn zero_value(&self) -> String {
        match self {
            SolidityType::Address => "address(0)".to_string(),
            SolidityType::Bool => "false".to_string(),
            SolidityType::String => "\"\"".to_string(),
            SolidityType::Bytes => "new bytes(0)".to_string(),
            SolidityType::Uint(_) | SolidityType::Int(_) => "0".to_string(),
            SolidityType::FixedBytes(len) => format!("bytes{}(0)", len),
        }
    }

    /// Expression reinterpreting a `uint256` topic word as this type
    pub fn from_topic_word(&self, word: &str) -> Option<String> {
        match self {
            SolidityType::Address => Some(format!("address(uint160({}))", word)),
            SolidityType::Bool => Some(format!("{} != 0", word)),
            SolidityType::Uint(256) => Some(word.to_string()),
            SolidityType::Uint(bits) => Some(format!("uint{}({})", bits, word)),
            SolidityType::Int(256) => Some(format!("int256({})", word)),
            SolidityType::Int(bits) => Some(format!("int{}(int256({}))", bits, word)),
            SolidityType::FixedBytes(32) => Some(format!("bytes32({})", word)),
            SolidityType::FixedBytes(len) => Some(format!("bytes{}(bytes32({}))", len, word)),
            SolidityType::String | SolidityType::Bytes => None,
        }
    }

    /// Local variable declaration with the data location dynamic types need
    pub fn declaration(&self, ident: &str) -> String {
        match self {
            SolidityType::String | SolidityType::Bytes => format!("{} memory {}", self, ident),
            _ => format!("{} {}", self, ident),
        }
    }
}

impl FromStr for SolidityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let param = Reader::read(trimmed)
            .map_err(|e| Error::invalid_abi(format!("unrecognised type '{}': {}", s, e)))?;
        let ty = Self::from_param(&param)
            .ok_or_else(|| Error::invalid_abi(format!("unsupported type '{}'", s)))?;

        // Reader maps unknown identifiers to uint8 (user enums), so the
        // parsed type must print back to what was written.
        let canonical = match trimmed {
            "uint" => "uint256",
            "int" => "int256",
            other => other,
        };
        if ty.to_string() != canonical {
            return Err(Error::invalid_abi(format!("unsupported type '{}'", s)));
        }
        Ok(ty)
    }
}

impl fmt::Display for SolidityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolidityType::Address => write!(f, "address"),
            SolidityType::Bool => write!(f, "bool"),
            SolidityType::String => write!(f, "string"),
            SolidityType::Bytes => write!(f, "bytes"),
            SolidityType::Uint(bits) => write!(f, "uint{}", bits),
            SolidityType::Int(bits) => write!(f, "int{}", bits),
            SolidityType::FixedBytes(len) => write!(f, "bytes{}", len),
        }
    }
}

/// Event input with its declaration position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInput {
    pub name: String,
    pub ty: SolidityType,
    pub indexed: bool,
    /// Position in the event declaration
    pub position: usize,
}

/// Event derived from an ABI entry of kind `event`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub name: String,
    pub inputs: Vec<EventInput>,
    /// `Name(type1,type2,...)`
    pub canonical_signature: String,
    /// `0x`-prefixed keccak-256 of the canonical signature
    pub topic0: String,
}

impl EventInfo {
    /// Input carried in `topic_<topic>`: the topic-th indexed input (1-based)
    pub fn indexed_input(&self, topic: u8) -> Option<&EventInput> {
        if topic == 0 {
            return None;
        }
        self.inputs
            .iter()
            .filter(|input| input.indexed)
            .nth(topic as usize - 1)
    }

    /// Non-indexed inputs in the order they are laid out in the log data blob
    pub fn data_layout(&self) -> Vec<&EventInput> {
        self.inputs.iter().filter(|input| !input.indexed).collect()
    }

    /// Look up a non-indexed input by name, returning its data slot
    pub fn data_field(&self, name: &str) -> Option<(usize, &EventInput)> {
        self.data_layout()
            .into_iter()
            .enumerate()
            .find(|(_, input)| input.name == name)
    }

    /// Any input with this name, indexed or not
    pub fn input_named(&self, name: &str) -> Option<&EventInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Function input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInput {
    pub name: String,
    pub ty: SolidityType,
}

/// State-changing function derived from an ABI entry of kind `function`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub inputs: Vec<FunctionInput>,
    pub canonical_signature: String,
    /// `0x`-prefixed 4-byte selector
    pub selector: String,
    pub state_mutability: StateMutability,
}

/// Where a destination parameter takes its value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceKind {
    /// Solidity literal emitted verbatim
    FixedLiteral { value: String },
    /// Indexed event parameter read from `topic_<topic_index>`
    EventTopic {
        #[serde(rename = "topicIndex")]
        topic_index: u8,
    },
    /// Non-indexed event parameter decoded from the log data
    EventDataField {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
    /// Zero value of the target type
    Unbound,
}

/// Binding of one destination-function parameter, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMapping {
    pub target_param_name: String,
    pub target_type: String,
    pub source: SourceKind,
}

impl InputMapping {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, target_type: T, source: SourceKind) -> Self {
        Self {
            target_param_name: name.into(),
            target_type: target_type.into(),
            source,
        }
    }

    pub fn literal<N: Into<String>, T: Into<String>, V: Into<String>>(name: N, target_type: T, value: V) -> Self {
        Self::new(name, target_type, SourceKind::FixedLiteral { value: value.into() })
    }

    pub fn topic<N: Into<String>, T: Into<String>>(name: N, target_type: T, topic_index: u8) -> Self {
        Self::new(name, target_type, SourceKind::EventTopic { topic_index })
    }

    pub fn data_field<N: Into<String>, T: Into<String>, F: Into<String>>(name: N, target_type: T, field: F) -> Self {
        Self::new(name, target_type, SourceKind::EventDataField { field_name: field.into() })
    }

    pub fn unbound<N: Into<String>, T: Into<String>>(name: N, target_type: T) -> Self {
        Self::new(name, target_type, SourceKind::Unbound)
    }
}

/// Validated value source of a destination parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    Literal(String),
    Topic { index: u8 },
    /// `slot` is the position among the event's non-indexed inputs
    DataField { name: String, slot: usize },
    ZeroValue(String),
}

/// Mapping after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub target_param_name: String,
    pub target_type: SolidityType,
    pub source: ResolvedSource,
}

/// Event-to-function pairing with one resolved mapping per function input.
///
/// Only `validation::resolve_binding` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    event: EventInfo,
    function: FunctionInfo,
    mappings: Vec<ResolvedMapping>,
}

impl Binding {
    pub(crate) fn new(event: EventInfo, function: FunctionInfo, mappings: Vec<ResolvedMapping>) -> Self {
        Self { event, function, mappings }
    }

    pub fn event(&self) -> &EventInfo {
        &self.event
    }

    pub fn function(&self) -> &FunctionInfo {
        &self.function
    }

    pub fn mappings(&self) -> &[ResolvedMapping] {
        &self.mappings
    }

    /// Whether any argument is decoded from the log data blob
    pub fn uses_log_data(&self) -> bool {
        self.mappings
            .iter()
            .any(|m| matches!(m.source, ResolvedSource::DataField { .. }))
    }
}

/// Contract shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyKind {
    /// One origin contract per binding
    ProtocolToProtocol,
    /// A single origin contract shared by all bindings
    OriginToProtocol,
    /// Any contract on the origin chain
    BlockchainWide,
}

impl FromStr for TopologyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "protocoltoprotocol" => Ok(TopologyKind::ProtocolToProtocol),
            "origintoprotocol" => Ok(TopologyKind::OriginToProtocol),
            "blockchainwide" => Ok(TopologyKind::BlockchainWide),
            _ => Err(Error::UnsupportedTopology(s.to_string())),
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyKind::ProtocolToProtocol => write!(f, "ProtocolToProtocol"),
            TopologyKind::OriginToProtocol => write!(f, "OriginToProtocol"),
            TopologyKind::BlockchainWide => write!(f, "BlockchainWide"),
        }
    }
}

/// Single input to the code emitter
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub topology: TopologyKind,
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    /// One per binding, one shared, or none, depending on the topology
    pub origin_addresses: Vec<String>,
    pub destination_address: String,
    pub bindings: Vec<Binding>,
    pub pausable: bool,
    /// Overrides the configured default contract name
    pub contract_name: Option<String>,
}

/// Binding as it arrives in a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BindingRequest {
    /// Raw ABI entry of the origin event
    pub event: Value,
    /// Raw ABI entry of the destination function
    pub function: Value,
    pub input_mappings: Vec<InputMapping>,
}

/// Logical API surface of the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerationRequest {
    pub topology: String,
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    /// Also accepted as `originAddress`, holding one address or a list
    #[serde(default, alias = "originAddress", deserialize_with = "one_or_many")]
    pub origin_addresses: Vec<String>,
    pub destination_address: String,
    pub bindings: Vec<BindingRequest>,
    #[serde(default)]
    pub pausable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(address) => vec![address],
        OneOrMany::Many(addresses) => addresses,
    })
}

/// Emitted Solidity source and the contract the compiler should look for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSource {
    pub source_text: String,
    pub contract_name: String,
}

/// Generated source, plus compiler output once compilation succeeds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub source_text: String,
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_abi: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_bytecode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CompilationDiagnostic>,
}

impl GeneratedArtifact {
    pub fn is_compiled(&self) -> bool {
        self.compiled_abi.is_some() && self.compiled_bytecode.is_some()
    }
}

impl From<GeneratedSource> for GeneratedArtifact {
    fn from(source: GeneratedSource) -> Self {
        Self {
            source_text: source.source_text,
            contract_name: source.contract_name,
            compiled_abi: None,
            compiled_bytecode: None,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solidity_type_parsing() {
        assert_eq!("address".parse::<SolidityType>().unwrap(), SolidityType::Address);
        assert_eq!("uint256".parse::<SolidityType>().unwrap(), SolidityType::Uint(256));
        assert_eq!("uint".parse::<SolidityType>().unwrap(), SolidityType::Uint(256));
        assert_eq!("uint8".parse::<SolidityType>().unwrap(), SolidityType::Uint(8));
        assert_eq!("int64".parse::<SolidityType>().unwrap(), SolidityType::Int(64));
        assert_eq!("bytes32".parse::<SolidityType>().unwrap(), SolidityType::FixedBytes(32));
        assert_eq!("bytes".parse::<SolidityType>().unwrap(), SolidityType::Bytes);
        assert_eq!("string".parse::<SolidityType>().unwrap(), SolidityType::String);
    }

    #[test]
    fn test_unsupported_types_are_rejected() {
        for ty in [
            "uint256[]", "address[2]", "tuple", "uint7", "uint512", "bytes33", "fixed128x18", "ufixed", "foo",
            "byte", "MyEnum", "uint08", "bytes0",
        ] {
            let err = ty.parse::<SolidityType>().unwrap_err();
            assert!(matches!(err, Error::InvalidAbi(_)), "{} should be rejected", ty);
        }
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(SolidityType::Address.zero_value(), "address(0)");
        assert_eq!(SolidityType::Uint(256).zero_value(), "0");
        assert_eq!(SolidityType::Bool.zero_value(), "false");
        assert_eq!(SolidityType::FixedBytes(32).zero_value(), "bytes32(0)");
        assert_eq!(SolidityType::String.zero_value(), "\"\"");
    }

    #[test]
    fn test_topic_casts() {
        assert_eq!(
            SolidityType::Address.from_topic_word("log.topic_1").as_deref(),
            Some("address(uint160(log.topic_1))")
        );
        assert_eq!(
            SolidityType::Bool.from_topic_word("log.topic_2").as_deref(),
            Some("log.topic_2 != 0")
        );
        assert_eq!(
            SolidityType::Uint(256).from_topic_word("log.topic_3").as_deref(),
            Some("log.topic_3")
        );
        assert_eq!(SolidityType::String.from_topic_word("log.topic_1"), None);
    }

    #[test]
    fn test_topology_parsing() {
        assert_eq!("ProtocolToProtocol".parse::<TopologyKind>().unwrap(), TopologyKind::ProtocolToProtocol);
        assert_eq!("origin-to-protocol".parse::<TopologyKind>().unwrap(), TopologyKind::OriginToProtocol);
        assert_eq!("blockchain_wide".parse::<TopologyKind>().unwrap(), TopologyKind::BlockchainWide);

        let err = "Mesh".parse::<TopologyKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTopology(ref t) if t == "Mesh"));
    }

    #[test]
    fn test_input_mapping_json_shape() {
        let json = r#"[
            {"targetParamName": "to", "targetType": "address", "source": {"kind": "eventTopic", "topicIndex": 2}},
            {"targetParamName": "amount", "targetType": "uint256", "source": {"kind": "eventDataField", "fieldName": "value"}},
            {"targetParamName": "memo", "targetType": "string", "source": {"kind": "fixedLiteral", "value": "\"hi\""}},
            {"targetParamName": "flag", "targetType": "bool", "source": {"kind": "unbound"}}
        ]"#;

        let mappings: Vec<InputMapping> = serde_json::from_str(json).unwrap();
        assert_eq!(mappings[0], InputMapping::topic("to", "address", 2));
        assert_eq!(mappings[1], InputMapping::data_field("amount", "uint256", "value"));
        assert_eq!(mappings[2], InputMapping::literal("memo", "string", "\"hi\""));
        assert_eq!(mappings[3], InputMapping::unbound("flag", "bool"));
    }

    fn request_json(origin: &str) -> String {
        format!(
            r#"{{"topology": "OriginToProtocol", "originChainId": 1, "destinationChainId": 8453,
                {}
                "destinationAddress": "0x3333333333333333333333333333333333333333",
                "bindings": []}}"#,
            origin
        )
    }

    #[test]
    fn test_request_accepts_singular_origin_address() {
        let request: GenerationRequest = serde_json::from_str(&request_json(
            r#""originAddress": "0x1111111111111111111111111111111111111111","#,
        ))
        .unwrap();
        assert_eq!(request.origin_addresses, vec!["0x1111111111111111111111111111111111111111"]);

        let request: GenerationRequest = serde_json::from_str(&request_json(
            r#""originAddresses": ["0x1111111111111111111111111111111111111111", "0x2222222222222222222222222222222222222222"],"#,
        ))
        .unwrap();
        assert_eq!(request.origin_addresses.len(), 2);

        let request: GenerationRequest = serde_json::from_str(&request_json("")).unwrap();
        assert!(request.origin_addresses.is_empty());
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<GenerationRequest>(&request_json(
            r#""originAdress": "0x1111111111111111111111111111111111111111","#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("unknown field `originAdress`"));
    }
}
