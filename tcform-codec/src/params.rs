//! Parameter codec.
//!
//! The declarative side carries up to three independent maps
//! (`env_params`, `sys_params`, `config_params`); the remote side carries a
//! single collection tagged by [`ParameterKind`]. Kinds partition names, so
//! merge order never changes the resulting content, only construction order.

use serde_yaml::Value;

use tcform_core::{ParamMap, Parameter, ParameterCollection, ParameterKind, ParameterMaps};

use crate::error::CodecError;

/// Expand one declarative map into parameters of `kind`.
///
/// Fails on the first non-string value.
pub fn expand_parameters(
    map: &ParamMap,
    kind: ParameterKind,
) -> Result<ParameterCollection, CodecError> {
    let mut out = ParameterCollection::new();
    for (name, value) in map {
        let Value::String(value) = value else {
            return Err(CodecError::InvalidParameterValue {
                kind,
                name: name.clone(),
                found: value_type_name(value),
            });
        };
        out.add_or_replace(Parameter::new(kind, name.as_str(), value.as_str()));
    }
    Ok(out)
}

/// Expand all declared kinds into one collection.
///
/// Merge order is Configuration, System, Environment. A kind whose field is
/// absent contributes nothing.
pub fn expand_parameter_collection(maps: &ParameterMaps) -> Result<ParameterCollection, CodecError> {
    let mut out = ParameterCollection::new();
    for kind in ParameterKind::MERGE_ORDER {
        if let Some(map) = maps.get(kind) {
            out = out.concat(expand_parameters(map, kind)?);
        }
    }
    Ok(out)
}

/// Partition a collection back into per-kind maps.
///
/// A kind with no members yields `None`, never an empty map.
pub fn flatten_parameter_collection(params: &ParameterCollection) -> ParameterMaps {
    let mut maps = ParameterMaps::default();
    for kind in ParameterKind::MERGE_ORDER {
        let map: ParamMap = params
            .of_kind(kind)
            .map(|p| (p.name.clone(), Value::String(p.value.clone())))
            .collect();
        if !map.is_empty() {
            maps.set(kind, Some(map));
        }
    }
    maps
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a map",
        Value::Tagged(_) => "a tagged value",
    }
}
