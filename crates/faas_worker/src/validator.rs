//! Worker-side signature and workflow type validation (spec.md §4.6,
//! §4.7 "Worker-side (type)").

use crate::error::{Result, WorkerError};
use faas_protocol::types::FunctionDescriptor;
use faas_protocol::value::ValueType;
use faas_protocol::ArgValue;
use std::collections::BTreeMap;

/// The coercion allowlist (spec.md §4.6): symmetric within each row,
/// checked only when the *declared* parameter type is the row key and
/// the *provided* type is in its list.
pub fn coerces(declared: ValueType, provided: ValueType) -> bool {
    use ValueType::*;
    if declared == provided {
        return true;
    }
    matches!(
        (declared, provided),
        (Bool, Int) | (Bool, Float) | (Bool, Complex)
            | (Int, Bool) | (Int, Float) | (Int, Complex)
            | (Float, Bool) | (Float, Int) | (Float, Complex)
            | (Complex, Bool) | (Complex, Int) | (Complex, Float)
            | (Bytes, BytesBuffer)
            | (BytesBuffer, Bytes)
    )
}

/// Check one positional/default argument against its declared type.
/// Argument references (`"$x.output"`) are never type-checked against
/// their literal string form (spec.md §4.6): callers must resolve them
/// before calling this.
fn value_matches(declared: ValueType, value: &ArgValue) -> bool {
    coerces(declared, value.value_type())
}

/// Validate a call's arguments against a function's declared signature
/// (spec.md §4.7 worker-side checks): positional arity and types must
/// match/coerce; default args must name existing parameters without
/// duplicating a positionally-filled one.
pub fn validate_call(
    descriptor: &FunctionDescriptor,
    positional_args: &[ArgValue],
    default_args: &BTreeMap<String, ArgValue>,
) -> Result<()> {
    if positional_args.len() != descriptor.positional_params.len() {
        return Err(WorkerError::ValidationFailed(format!(
            "{} expects {} positional arguments, got {}",
            descriptor.name,
            descriptor.positional_params.len(),
            positional_args.len()
        )));
    }

    for (param, value) in descriptor.positional_params.iter().zip(positional_args) {
        let declared = param
            .ty
            .ok_or_else(|| WorkerError::MissingAnnotation(param.name.clone()))?;
        if !value_matches(declared, value) {
            return Err(WorkerError::ValidationFailed(format!(
                "argument '{}' of {} expects {declared}, got {:?}",
                param.name,
                descriptor.name,
                value.value_type()
            )));
        }
    }

    let positional_names: std::collections::HashSet<&str> = descriptor
        .positional_params
        .iter()
        .map(|p| p.name.as_str())
        .collect();

    for (name, value) in default_args {
        if positional_names.contains(name.as_str()) {
            return Err(WorkerError::ValidationFailed(format!(
                "'{name}' supplied both positionally and by name in call to {}",
                descriptor.name
            )));
        }
        let declared_param = descriptor
            .default_params
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| {
                WorkerError::ValidationFailed(format!(
                    "{} has no default parameter named '{name}'",
                    descriptor.name
                ))
            })?;
        let declared = declared_param
            .ty
            .ok_or_else(|| WorkerError::MissingAnnotation(name.clone()))?;
        if !value_matches(declared, value) {
            return Err(WorkerError::ValidationFailed(format!(
                "default argument '{name}' of {} expects {declared}, got {:?}",
                descriptor.name,
                value.value_type()
            )));
        }
    }

    Ok(())
}

/// Check that a producer's declared return type is compatible with a
/// consumer's declared parameter type across an `"$a.output"` edge
/// (spec.md §4.6 step 2).
pub fn return_type_compatible(producer_return: ValueType, consumer_param: ValueType) -> bool {
    coerces(consumer_param, producer_return)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faas_protocol::types::{DefaultParam, Param};

    fn add_descriptor() -> FunctionDescriptor {
        FunctionDescriptor {
            name: "add".to_string(),
            positional_params: vec![
                Param { name: "a".into(), ty: Some(ValueType::Int) },
                Param { name: "b".into(), ty: Some(ValueType::Int) },
            ],
            default_params: vec![DefaultParam {
                name: "c".into(),
                ty: Some(ValueType::Int),
                default: ArgValue::Int(18),
            }],
            return_type: Some(ValueType::Int),
            procedure: "add".into(),
        }
    }

    #[test]
    fn coercion_allowlist_is_symmetric_per_row() {
        assert!(coerces(ValueType::Int, ValueType::Bool));
        assert!(coerces(ValueType::Bool, ValueType::Int));
        assert!(coerces(ValueType::Float, ValueType::Int));
        assert!(!coerces(ValueType::Str, ValueType::Int));
    }

    #[test]
    fn rejects_wrong_positional_arity() {
        let d = add_descriptor();
        let err = validate_call(&d, &[ArgValue::Int(1)], &Default::default()).unwrap_err();
        assert!(matches!(err, WorkerError::ValidationFailed(_)));
    }

    #[test]
    fn rejects_duplicate_positional_and_named_argument() {
        let d = add_descriptor();
        let mut defaults = BTreeMap::new();
        defaults.insert("a".to_string(), ArgValue::Int(5));
        let err = validate_call(&d, &[ArgValue::Int(1), ArgValue::Int(2)], &defaults).unwrap_err();
        assert!(matches!(err, WorkerError::ValidationFailed(_)));
    }

    #[test]
    fn accepts_coerced_bool_in_int_slot() {
        let d = add_descriptor();
        assert!(validate_call(&d, &[ArgValue::Bool(true), ArgValue::Int(2)], &Default::default()).is_ok());
    }

    #[test]
    fn int_to_float_return_edge_is_compatible() {
        assert!(return_type_compatible(ValueType::Int, ValueType::Float));
    }
}
