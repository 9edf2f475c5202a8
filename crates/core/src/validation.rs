//! Binding resolution: checks how each destination parameter is sourced from
//! the origin event and normalises the mappings for the emitter.

use std::collections::HashSet;
use tracing::debug;

use crate::types::{
    Binding, EventInfo, FunctionInfo, InputMapping, ResolvedMapping, ResolvedSource, SolidityType,
    SourceKind,
};
use crate::{Error, Result};

/// EVM logs expose topic_1..topic_3 for indexed parameters
pub const MAX_TOPIC_MAPPINGS: usize = 3;

/// Validate `raw_mappings` against the event and function and build a [`Binding`].
///
/// Mapping `i` binds `function.inputs[i]`. The first violation is returned as
/// a validation error carrying the offending mapping index.
pub fn resolve_binding(
    event: &EventInfo,
    function: &FunctionInfo,
    raw_mappings: &[InputMapping],
) -> Result<Binding> {
    if raw_mappings.len() != function.inputs.len() {
        return Err(Error::validation(format!(
            "{} takes {} parameters but {} mappings were supplied",
            function.canonical_signature,
            function.inputs.len(),
            raw_mappings.len()
        )));
    }

    let mut claimed_topics = HashSet::new();
    let mut resolved = Vec::with_capacity(raw_mappings.len());

    for (index, (mapping, input)) in raw_mappings.iter().zip(&function.inputs).enumerate() {
        let target_type: SolidityType = mapping
            .target_type
            .parse()
            .map_err(|e: Error| Error::mapping(index, e.to_string()))?;

        if target_type != input.ty {
            return Err(Error::mapping(
                index,
                format!(
                    "target type {} does not match parameter '{}' of type {}",
                    mapping.target_type, input.name, input.ty
                ),
            ));
        }

        let source = match &mapping.source {
            SourceKind::FixedLiteral { value } => {
                if value.trim().is_empty() {
                    return Err(Error::mapping(index, "fixed literal is empty"));
                }
                ResolvedSource::Literal(value.clone())
            }
            SourceKind::EventTopic { topic_index } => {
                resolve_topic(event, index, *topic_index, target_type, &mut claimed_topics)?
            }
            SourceKind::EventDataField { field_name } => {
                resolve_data_field(event, index, field_name, target_type)?
            }
            SourceKind::Unbound => ResolvedSource::ZeroValue(target_type.zero_value()),
        };

        debug!(
            event = %event.name,
            function = %function.name,
            index,
            param = %mapping.target_param_name,
            source = ?source,
            "resolved input mapping"
        );

        resolved.push(ResolvedMapping {
            target_param_name: mapping.target_param_name.clone(),
            target_type,
            source,
        });
    }

    Ok(Binding::new(event.clone(), function.clone(), resolved))
}

fn resolve_topic(
    event: &EventInfo,
    index: usize,
    topic_index: u8,
    target_type: SolidityType,
    claimed_topics: &mut HashSet<u8>,
) -> Result<ResolvedSource> {
    if claimed_topics.len() >= MAX_TOPIC_MAPPINGS {
        return Err(Error::mapping(
            index,
            format!("topic slots exhausted: at most {} topic mappings per binding", MAX_TOPIC_MAPPINGS),
        ));
    }

    if !(1..=MAX_TOPIC_MAPPINGS as u8).contains(&topic_index) {
        return Err(Error::mapping(
            index,
            format!("topic index {} out of range 1..=3", topic_index),
        ));
    }

    if !claimed_topics.insert(topic_index) {
        return Err(Error::mapping(
            index,
            format!("topic index {} is already mapped", topic_index),
        ));
    }

    let input = event.indexed_input(topic_index).ok_or_else(|| {
        Error::mapping(
            index,
            format!(
                "event {} has no indexed input at topic {}",
                event.canonical_signature, topic_index
            ),
        )
    })?;

    // Indexed string/bytes inputs are stored as their keccak hash, which only
    // a bytes32 parameter can receive.
    if !input.ty.is_word() {
        if target_type != SolidityType::FixedBytes(32) {
            return Err(Error::mapping(
                index,
                format!(
                    "topic {} carries the hash of '{}', it cannot bind a {} parameter",
                    topic_index, input.name, target_type
                ),
            ));
        }
    } else if input.ty != target_type {
        return Err(Error::mapping(
            index,
            format!(
                "topic {} holds '{}' of type {} but the target type is {}",
                topic_index, input.name, input.ty, target_type
            ),
        ));
    }

    Ok(ResolvedSource::Topic { index: topic_index })
}

fn resolve_data_field(
    event: &EventInfo,
    index: usize,
    field_name: &str,
    target_type: SolidityType,
) -> Result<ResolvedSource> {
    let (slot, input) = match event.data_field(field_name) {
        Some(found) => found,
        None => {
            let reason = match event.input_named(field_name) {
                Some(_) => format!("field '{}' is indexed and does not appear in the log data", field_name),
                None => format!("event {} has no field '{}'", event.canonical_signature, field_name),
            };
            return Err(Error::mapping(index, reason));
        }
    };

    if input.ty != target_type {
        return Err(Error::mapping(
            index,
            format!(
                "field '{}' has type {} but the target type is {}",
                field_name, input.ty, target_type
            ),
        ));
    }

    Ok(ResolvedSource::DataField {
        name: field_name.to_string(),
        slot,
    })
}
