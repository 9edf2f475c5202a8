//! Typed Solidity fragments
//!
//! The emitter builds these statements first and renders them to text last,
//! so ordering and symmetry can be checked on the structures themselves.

use reactgen_core::types::{Binding, ResolvedSource, SolidityType};

use super::strategy::OriginCriterion;

const BODY_INDENT: &str = "        ";
const BRANCH_INDENT: &str = "            ";

/// Rendering of a fragment into Solidity source lines
pub trait SolidityFragment {
    fn render(&self) -> String;
}

/// `uint256 private constant EVENT_<i>_TOPIC_0 = <topic0>;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConstant {
    pub index: usize,
    pub topic0: String,
}

impl TopicConstant {
    pub fn ident(&self) -> String {
        topic_ident(self.index)
    }
}

impl SolidityFragment for TopicConstant {
    fn render(&self) -> String {
        format!("    uint256 private constant {} = {};", self.ident(), self.topic0)
    }
}

pub fn topic_ident(index: usize) -> String {
    format!("EVENT_{}_TOPIC_0", index)
}

/// One `(chain, contract, topic_0, ignore, ignore, ignore)` subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Expression for the origin chain id
    pub chain_id: String,
    pub origin: OriginCriterion,
    /// Identifier of the topic constant
    pub topic0: String,
}

impl Subscription {
    fn arguments(&self) -> String {
        format!(
            "{}, {}, {}, REACTIVE_IGNORE, REACTIVE_IGNORE, REACTIVE_IGNORE",
            self.chain_id,
            self.origin.render(),
            self.topic0
        )
    }

    /// Constructor call; a failure only ever sets the shared flag
    pub fn constructor_call(&self) -> String {
        format!(
            "{i}try service.subscribe({args}) {{\n{i}}} catch {{\n{i}    subscriptionFailed = true;\n{i}}}",
            i = BRANCH_INDENT,
            args = self.arguments()
        )
    }

    /// Entry `slot` of the pausable subscription table
    pub fn table_entry(&self, slot: usize) -> String {
        format!(
            "{}result[{}] = Subscription({});",
            BODY_INDENT,
            slot,
            self.arguments()
        )
    }
}

/// Typed local holding one destination argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgument {
    pub ty: SolidityType,
    pub ident: String,
    pub value: String,
}

impl SolidityFragment for CallArgument {
    fn render(&self) -> String {
        format!("{}{} = {};", BRANCH_INDENT, self.ty.declaration(&self.ident), self.value)
    }
}

/// Destructuring decode of the log data blob.
///
/// Every non-indexed field is listed in the type tuple; only fields a mapping
/// reads get a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDecode {
    pub fields: Vec<(SolidityType, Option<String>)>,
}

impl SolidityFragment for DataDecode {
    fn render(&self) -> String {
        let targets: Vec<String> = self
            .fields
            .iter()
            .map(|(ty, ident)| match ident {
                Some(ident) => ty.declaration(ident),
                None => String::new(),
            })
            .collect();
        let types: Vec<String> = self.fields.iter().map(|(ty, _)| ty.to_string()).collect();

        if let [(ty, Some(ident))] = self.fields.as_slice() {
            return format!(
                "{}{} = abi.decode(log.data, ({}));",
                BRANCH_INDENT,
                ty.declaration(ident),
                ty
            );
        }

        format!(
            "{}({}) = abi.decode(log.data, ({}));",
            BRANCH_INDENT,
            targets.join(", "),
            types.join(", ")
        )
    }
}

pub fn data_ident(slot: usize) -> String {
    format!("data_{}", slot)
}

/// One `topic_0` branch of `react`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchBranch {
    /// Identifier of the topic constant this branch matches
    pub topic0: String,
    pub decode: Option<DataDecode>,
    pub arguments: Vec<CallArgument>,
    /// Canonical signature of the destination function
    pub signature: String,
}

impl DispatchBranch {
    /// Build the branch for binding `index`
    pub fn for_binding(index: usize, binding: &Binding) -> Self {
        let decode = if binding.uses_log_data() {
            let used: Vec<usize> = binding
                .mappings()
                .iter()
                .filter_map(|m| match m.source {
                    ResolvedSource::DataField { slot, .. } => Some(slot),
                    _ => None,
                })
                .collect();

            let fields = binding
                .event()
                .data_layout()
                .iter()
                .enumerate()
                .map(|(slot, input)| {
                    let ident = used.contains(&slot).then(|| data_ident(slot));
                    (input.ty, ident)
                })
                .collect();

            Some(DataDecode { fields })
        } else {
            None
        };

        let arguments = binding
            .mappings()
            .iter()
            .enumerate()
            .map(|(position, mapping)| {
                let value = match &mapping.source {
                    ResolvedSource::Literal(literal) => literal.clone(),
                    ResolvedSource::ZeroValue(zero) => zero.clone(),
                    ResolvedSource::DataField { slot, .. } => data_ident(*slot),
                    ResolvedSource::Topic { index } => {
                        let word = format!("log.topic_{}", index);
                        // Resolution only admits word-sized targets for topics
                        mapping
                            .target_type
                            .from_topic_word(&word)
                            .unwrap_or(word)
                    }
                };

                CallArgument {
                    ty: mapping.target_type,
                    ident: format!("arg_{}", position),
                    value,
                }
            })
            .collect();

        Self {
            topic0: topic_ident(index),
            decode,
            arguments,
            signature: binding.function().canonical_signature.clone(),
        }
    }

    fn payload(&self) -> String {
        let mut args = vec![format!("\"{}\"", self.signature)];
        args.extend(self.arguments.iter().map(|a| a.ident.clone()));
        format!(
            "{}bytes memory payload = abi.encodeWithSignature({});",
            BRANCH_INDENT,
            args.join(", ")
        )
    }

    fn body(&self) -> String {
        let mut lines = Vec::new();
        if let Some(decode) = &self.decode {
            lines.push(decode.render());
        }
        lines.extend(self.arguments.iter().map(|a| a.render()));
        lines.push(self.payload());
        lines.push(format!(
            "{}emit Callback(DESTINATION_CHAIN_ID, DESTINATION_CONTRACT, CALLBACK_GAS_LIMIT, payload);",
            BRANCH_INDENT
        ));
        lines.join("\n")
    }
}

/// Chain the branches as `if ... else if ...` in order
pub fn render_dispatch(branches: &[DispatchBranch]) -> String {
    branches
        .iter()
        .enumerate()
        .map(|(position, branch)| {
            let keyword = if position == 0 { "if" } else { "} else if" };
            format!(
                "{}{} (log.topic_0 == {}) {{\n{}",
                if position == 0 { BODY_INDENT } else { "" },
                keyword,
                branch.topic0,
                branch.body()
            )
        })
        .collect::<Vec<_>>()
        .join(&format!("\n{}", BODY_INDENT))
        + &format!("\n{}}}", BODY_INDENT)
}

/// Base contract the generated contract extends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseContract {
    Reactive,
    PausableReactive,
}

impl BaseContract {
    pub fn for_pausable(pausable: bool) -> Self {
        if pausable {
            BaseContract::PausableReactive
        } else {
            BaseContract::Reactive
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseContract::Reactive => "AbstractReactive",
            BaseContract::PausableReactive => "AbstractPausableReactive",
        }
    }
}

/// Everything substituted into the contract skeleton
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFragments {
    pub constants: Vec<TopicConstant>,
    pub subscriptions: Vec<Subscription>,
    pub branches: Vec<DispatchBranch>,
    /// Present only for pausable contracts; mirrors `subscriptions`
    pub pausable_table: Option<Vec<Subscription>>,
    pub base: BaseContract,
}

impl ContractFragments {
    pub fn render_constants(&self) -> String {
        self.constants
            .iter()
            .map(|c| c.render())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_subscriptions(&self) -> String {
        self.subscriptions
            .iter()
            .map(|s| s.constructor_call())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_dispatch(&self) -> String {
        render_dispatch(&self.branches)
    }

    pub fn render_pausable_table(&self) -> Option<String> {
        self.pausable_table.as_ref().map(|table| {
            table
                .iter()
                .enumerate()
                .map(|(slot, s)| s.table_entry(slot))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}
