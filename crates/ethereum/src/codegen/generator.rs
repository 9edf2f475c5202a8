//! Code generator for reactive contracts
//!
//! Turns a validated `GenerationConfig` into Solidity source: the strategy is
//! selected first, the typed fragments are built next and the skeleton is
//! rendered last.

use super::solidity::{
    BaseContract, ContractFragments, DispatchBranch, Subscription, TopicConstant,
};
use super::strategy::{parse_address, select_strategy};
use super::templates::{ReactiveTemplateManager, REACTIVE_CONTRACT};
use alloy_primitives::Address;
use convert_case::{Case, Casing};
use reactgen_core::config::{is_identifier, GeneratorConfig};
use reactgen_core::types::{GeneratedSource, GenerationConfig};
use reactgen_core::{Error, Result};
use serde_json::json;
use tracing::{debug, info};

/// Names declared by the skeleton itself
const RESERVED_NAMES: &[&str] = &[
    "ISubscriptionService",
    "IReactive",
    "AbstractReactive",
    "AbstractPausableReactive",
    "LogRecord",
    "Subscription",
];

/// Code generator for reactive contracts
#[derive(Debug)]
pub struct ReactiveContractCodegen {
    config: GeneratorConfig,
    templates: ReactiveTemplateManager,
}

impl ReactiveContractCodegen {
    /// Create a new code generator with the given configuration
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Ok(Self {
            config,
            templates: ReactiveTemplateManager::new()?,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build every fragment of the contract without rendering the skeleton
    pub fn build_fragments(&self, config: &GenerationConfig) -> Result<ContractFragments> {
        if config.bindings.is_empty() {
            return Err(Error::validation("at least one binding is required"));
        }

        let strategy = select_strategy(config)?;
        debug!(
            topology = %strategy.kind,
            bindings = config.bindings.len(),
            "Selected emission strategy"
        );

        let mut constants = Vec::with_capacity(config.bindings.len());
        let mut subscriptions = Vec::with_capacity(config.bindings.len());
        let mut branches = Vec::with_capacity(config.bindings.len());

        for (index, (binding, origin)) in config.bindings.iter().zip(&strategy.origins).enumerate() {
            let constant = TopicConstant {
                index,
                topic0: binding.event().topic0.clone(),
            };

            subscriptions.push(Subscription {
                chain_id: "ORIGIN_CHAIN_ID".to_string(),
                origin: *origin,
                topic0: constant.ident(),
            });
            branches.push(DispatchBranch::for_binding(index, binding));

            debug!(
                index,
                event = %binding.event().canonical_signature,
                function = %binding.function().canonical_signature,
                origin = %origin.render(),
                "Built binding fragments"
            );
            constants.push(constant);
        }

        // Same descriptors as the constructor so pause and resume stay symmetric
        let pausable_table = config.pausable.then(|| subscriptions.clone());

        Ok(ContractFragments {
            constants,
            subscriptions,
            branches,
            pausable_table,
            base: BaseContract::for_pausable(config.pausable),
        })
    }

    /// Emit the complete Solidity source for `config`
    pub fn emit(&self, config: &GenerationConfig) -> Result<GeneratedSource> {
        let contract_name = self.contract_name(config)?;
        let destination = parse_address(&config.destination_address)?;
        if destination == Address::ZERO {
            return Err(Error::validation("destination address must not be the zero address"));
        }

        let fragments = self.build_fragments(config)?;

        let data = json!({
            "license": self.config.license,
            "pragma": self.config.solidity_pragma,
            "contract_name": contract_name,
            "base_contract": fragments.base.name(),
            "origin_chain_id": config.origin_chain_id,
            "destination_chain_id": config.destination_chain_id,
            "destination_contract": destination.to_checksum(None),
            "callback_gas_limit": self.config.callback_gas_limit,
            "topic_constants": fragments.render_constants(),
            "subscriptions": fragments.render_subscriptions(),
            "dispatch": fragments.render_dispatch(),
            "pausable_table": fragments.render_pausable_table(),
            "subscription_count": fragments.subscriptions.len(),
        });

        let source_text = self.templates.render(REACTIVE_CONTRACT, &data)?;

        info!(
            contract = %contract_name,
            topology = %config.topology,
            bindings = config.bindings.len(),
            pausable = config.pausable,
            "Generated reactive contract source"
        );

        Ok(GeneratedSource {
            source_text,
            contract_name,
        })
    }

    /// Resolve the contract name, converting to PascalCase when needed
    pub fn contract_name(&self, config: &GenerationConfig) -> Result<String> {
        let requested = config
            .contract_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.config.default_contract_name.as_str());

        let name = if is_identifier(requested) {
            requested.to_string()
        } else {
            requested.to_case(Case::Pascal)
        };

        if !is_identifier(&name) {
            return Err(Error::validation(format!(
                "'{}' cannot be turned into a contract name",
                requested
            )));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(Error::validation(format!(
                "contract name '{}' collides with a declaration in the contract skeleton",
                name
            )));
        }

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactgen_core::types::TopologyKind;

    fn codegen() -> ReactiveContractCodegen {
        ReactiveContractCodegen::new(GeneratorConfig::default()).unwrap()
    }

    fn config(name: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            topology: TopologyKind::BlockchainWide,
            origin_chain_id: 1,
            destination_chain_id: 1,
            origin_addresses: Vec::new(),
            destination_address: "0x3333333333333333333333333333333333333333".to_string(),
            bindings: Vec::new(),
            pausable: false,
            contract_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_contract_name_resolution() {
        let codegen = codegen();
        assert_eq!(codegen.contract_name(&config(None)).unwrap(), "ReactiveContract");
        assert_eq!(codegen.contract_name(&config(Some("  "))).unwrap(), "ReactiveContract");
        assert_eq!(codegen.contract_name(&config(Some("Uniswap_Stop"))).unwrap(), "Uniswap_Stop");
        assert_eq!(
            codegen.contract_name(&config(Some("uniswap stop order"))).unwrap(),
            "UniswapStopOrder"
        );
    }

    #[test]
    fn test_contract_name_rejects_skeleton_names() {
        let err = codegen().contract_name(&config(Some("AbstractReactive"))).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn test_empty_bindings_rejected() {
        let err = codegen().emit(&config(None)).unwrap_err();
        assert!(matches!(err, Error::Validation { index: None, .. }));
    }

    #[test]
    fn test_zero_destination_rejected() {
        let mut config = config(None);
        config.destination_address = "0x0000000000000000000000000000000000000000".to_string();
        assert!(codegen().emit(&config).is_err());
    }
}
