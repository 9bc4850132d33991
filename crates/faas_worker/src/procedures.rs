//! The Worker's procedure table: the implementation-chosen stand-in for
//! the "opaque, serialized code blob" spec.md §1 places out of scope.
//!
//! spec.md §9 ("Code transport") explicitly leaves the blob
//! representation to the implementer as long as it is content-addressed.
//! This workspace resolves `FunctionDescriptor::procedure` against a
//! statically pre-registered table of native closures, analogous to how
//! the teacher resolves a `plugin_name` against its parser plugin
//! registry in `casparian_worker` (`DispatchCommand::plugin_name`).

use crate::error::{Result, WorkerError};
use faas_protocol::value::ValueType;
use faas_protocol::ArgValue;
use std::collections::BTreeMap;
use std::collections::HashMap;

pub type Procedure = fn(&[ArgValue], &BTreeMap<String, ArgValue>) -> Result<ArgValue>;

#[derive(Clone)]
pub struct ProcedureRegistry {
    procedures: HashMap<String, Procedure>,
}

impl ProcedureRegistry {
    /// The built-in procedures available on every Worker, used by
    /// clients submitting `serialized_func_base64` blobs that name one
    /// of these keys (spec.md §8 scenario 1/2/5 `add`/`scale`).
    pub fn with_builtins() -> Self {
        let mut procedures: HashMap<String, Procedure> = HashMap::new();
        procedures.insert("add".to_string(), proc_add);
        procedures.insert("sum".to_string(), proc_sum);
        procedures.insert("scale".to_string(), proc_scale);
        procedures.insert("identity".to_string(), proc_identity);
        procedures.insert("concat".to_string(), proc_concat);
        Self { procedures }
    }

    pub fn register(&mut self, name: impl Into<String>, proc: Procedure) {
        self.procedures.insert(name.into(), proc);
    }

    pub fn invoke(
        &self,
        procedure: &str,
        positional_args: &[ArgValue],
        default_args: &BTreeMap<String, ArgValue>,
    ) -> Result<ArgValue> {
        let f = self
            .procedures
            .get(procedure)
            .ok_or_else(|| WorkerError::ExecutionFailed(format!("unknown procedure '{procedure}'")))?;
        f(positional_args, default_args)
    }
}

impl Default for ProcedureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn as_f64(v: &ArgValue) -> Result<f64> {
    match v {
        ArgValue::Int(i) => Ok(*i as f64),
        ArgValue::Float(f) => Ok(*f),
        ArgValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(WorkerError::ExecutionFailed(format!(
            "expected a numeric argument, got {:?}",
            other.value_type()
        ))),
    }
}

/// `add(a: int, b: int, c: int = 18) -> int`: `a + b * c` (spec.md §8
/// scenario 1's worked example).
fn proc_add(positional_args: &[ArgValue], default_args: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    if positional_args.len() != 2 {
        return Err(WorkerError::ExecutionFailed(
            "add() takes exactly 2 positional arguments".to_string(),
        ));
    }
    let a = as_f64(&positional_args[0])?;
    let b = as_f64(&positional_args[1])?;
    let c = match default_args.get("c") {
        Some(v) => as_f64(v)?,
        None => 18.0,
    };
    Ok(ArgValue::Int((a + b * c) as i64))
}

/// `sum(a, b) -> a + b`, used where the chain scenario calls for a plain
/// sum rather than `add`'s multiply-by-default form.
fn proc_sum(positional_args: &[ArgValue], _default_args: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    let mut total = 0.0;
    for v in positional_args {
        total += as_f64(v)?;
    }
    Ok(ArgValue::Int(total as i64))
}

/// `scale(x: float) -> float`: `x * 2.0` (spec.md §8 scenario 5).
fn proc_scale(positional_args: &[ArgValue], default_args: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    let x = positional_args
        .first()
        .map(as_f64)
        .transpose()?
        .ok_or_else(|| WorkerError::ExecutionFailed("scale() requires one argument".to_string()))?;
    let factor = match default_args.get("factor") {
        Some(v) => as_f64(v)?,
        None => 2.0,
    };
    Ok(ArgValue::Float(x * factor))
}

fn proc_identity(positional_args: &[ArgValue], _default_args: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    positional_args
        .first()
        .cloned()
        .ok_or_else(|| WorkerError::ExecutionFailed("identity() requires one argument".to_string()))
}

fn proc_concat(positional_args: &[ArgValue], _default_args: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    let mut out = String::new();
    for v in positional_args {
        match v {
            ArgValue::Str(s) => out.push_str(s),
            other => {
                return Err(WorkerError::ExecutionFailed(format!(
                    "concat() expects str arguments, got {:?}",
                    other.value_type()
                )))
            }
        }
    }
    Ok(ArgValue::Str(out))
}

/// Convenience descriptor builder for the built-in `add` procedure,
/// used by tests and by the SDK's bundled example functions.
pub fn add_descriptor() -> faas_protocol::types::FunctionDescriptor {
    use faas_protocol::types::{DefaultParam, Param};
    faas_protocol::types::FunctionDescriptor {
        name: "add".to_string(),
        positional_params: vec![
            Param {
                name: "a".to_string(),
                ty: Some(ValueType::Int),
            },
            Param {
                name: "b".to_string(),
                ty: Some(ValueType::Int),
            },
        ],
        default_params: vec![DefaultParam {
            name: "c".to_string(),
            ty: Some(ValueType::Int),
            default: ArgValue::Int(18),
        }],
        return_type: Some(ValueType::Int),
        procedure: "add".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_matches_the_worked_example() {
        let registry = ProcedureRegistry::with_builtins();
        let mut defaults = BTreeMap::new();
        defaults.insert("c".to_string(), ArgValue::Int(21));
        let result = registry
            .invoke("add", &[ArgValue::Int(12), ArgValue::Int(69)], &defaults)
            .unwrap();
        assert_eq!(result, ArgValue::Int(12 + 69 * 21));
    }

    #[test]
    fn scale_doubles_by_default() {
        let registry = ProcedureRegistry::with_builtins();
        let result = registry
            .invoke("scale", &[ArgValue::Float(15.0)], &BTreeMap::new())
            .unwrap();
        assert_eq!(result, ArgValue::Float(30.0));
    }

    #[test]
    fn unknown_procedure_is_an_execution_failure() {
        let registry = ProcedureRegistry::with_builtins();
        let err = registry.invoke("nope", &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), faas_protocol::ErrorKind::ExecutionFailed);
    }
}
