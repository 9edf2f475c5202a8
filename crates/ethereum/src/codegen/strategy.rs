//! Topology strategy selection
//!
//! Resolves the origin contract criterion of every binding from the declared
//! topology. Selection is a closed match; there is no default strategy.

use alloy_primitives::Address;
use reactgen_core::types::{GenerationConfig, TopologyKind};
use reactgen_core::{Error, Result};
use std::str::FromStr;

/// Origin contract filter of one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginCriterion {
    /// Only logs emitted by this contract
    Contract(Address),
    /// Any contract on the origin chain
    Any,
}

impl OriginCriterion {
    /// Solidity expression for the subscription's contract argument
    pub fn render(&self) -> String {
        match self {
            OriginCriterion::Contract(address) => address.to_checksum(None),
            OriginCriterion::Any => "address(0)".to_string(),
        }
    }
}

/// Selected emission strategy with one origin criterion per binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub kind: TopologyKind,
    pub origins: Vec<OriginCriterion>,
}

/// Pick the strategy for `config.topology` and resolve its origins
pub fn select_strategy(config: &GenerationConfig) -> Result<Strategy> {
    let bindings = config.bindings.len();
    let addresses = &config.origin_addresses;

    let origins = match config.topology {
        TopologyKind::ProtocolToProtocol => {
            if addresses.len() == bindings {
                addresses
                    .iter()
                    .map(|raw| parse_origin(raw).map(OriginCriterion::Contract))
                    .collect::<Result<Vec<_>>>()?
            } else if addresses.len() == 1 {
                let origin = parse_origin(&addresses[0])?;
                vec![OriginCriterion::Contract(origin); bindings]
            } else {
                return Err(Error::validation(format!(
                    "ProtocolToProtocol needs one origin address per binding or a single shared one, got {} for {} bindings",
                    addresses.len(),
                    bindings
                )));
            }
        }
        TopologyKind::OriginToProtocol => {
            if addresses.len() != 1 {
                return Err(Error::validation(format!(
                    "OriginToProtocol needs exactly one origin address, got {}",
                    addresses.len()
                )));
            }
            let origin = parse_origin(&addresses[0])?;
            vec![OriginCriterion::Contract(origin); bindings]
        }
        TopologyKind::BlockchainWide => {
            if !addresses.is_empty() {
                return Err(Error::validation(
                    "BlockchainWide subscribes to every contract on the origin chain and takes no origin address",
                ));
            }
            vec![OriginCriterion::Any; bindings]
        }
    };

    Ok(Strategy {
        kind: config.topology,
        origins,
    })
}

fn parse_origin(raw: &str) -> Result<Address> {
    let address = parse_address(raw)?;
    if address == Address::ZERO {
        return Err(Error::validation(
            "origin address must not be the zero address, it would match every contract",
        ));
    }
    Ok(address)
}

/// Parse a `0x`-prefixed 20-byte hex address
pub fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(Error::validation(format!(
            "'{}' is not a valid address (0x followed by 40 hex characters)",
            raw
        )));
    }
    Address::from_str(trimmed)
        .map_err(|e| Error::validation(format!("'{}' is not a valid address: {}", raw, e)))
}
