//! The chain (workflow) executor (spec.md §4.6).

use crate::cache::{CacheKey, LruCache};
use crate::catalog::Catalog;
use crate::error::{Result, WorkerError};
use crate::procedures::ProcedureRegistry;
use crate::stats::StatsTable;
use crate::validator::{self, return_type_compatible};
use faas_protocol::types::Workflow;
use faas_protocol::ArgValue;
use std::collections::BTreeMap;
use std::time::Instant;

/// Resolve every `"$<name>.output"` reference in an argument list against
/// already-produced results, leaving every other literal untouched.
fn resolve_positional(args: &[ArgValue], results: &BTreeMap<String, ArgValue>) -> Result<Vec<ArgValue>> {
    args.iter().map(|v| resolve_one(v, results)).collect()
}

fn resolve_defaults(
    args: &BTreeMap<String, ArgValue>,
    results: &BTreeMap<String, ArgValue>,
) -> Result<BTreeMap<String, ArgValue>> {
    args.iter()
        .map(|(k, v)| resolve_one(v, results).map(|v| (k.clone(), v)))
        .collect()
}

fn resolve_one(value: &ArgValue, results: &BTreeMap<String, ArgValue>) -> Result<ArgValue> {
    match value.as_output_reference() {
        Some(source) => results.get(source).cloned().ok_or_else(|| {
            WorkerError::ValidationFailed(format!(
                "'{value:?}' references a function that has not executed yet"
            ))
        }),
        None => Ok(value.clone()),
    }
}

/// Preflight type-check pass over the whole workflow (spec.md §4.6 steps
/// 1-2). Run once before any function executes.
pub fn typecheck_workflow(workflow: &Workflow, catalog: &Catalog) -> Result<()> {
    let mut func_ids = BTreeMap::new();
    for name in workflow.functions.keys() {
        let (func_id, entry) = catalog.find_by_name(name).ok_or_else(|| {
            WorkerError::ValidationFailed(format!("'{name}' is not a registered function (missing_function)"))
        })?;
        func_ids.insert(name.clone(), (func_id.to_string(), entry.descriptor.clone()));
    }

    for (name, node) in &workflow.functions {
        let (_, descriptor) = &func_ids[name];

        if node.positional_args.len() != descriptor.positional_params.len() {
            return Err(WorkerError::ValidationFailed(format!(
                "{name} expects {} positional arguments, got {}",
                descriptor.positional_params.len(),
                node.positional_args.len()
            )));
        }

        for (param, arg) in descriptor.positional_params.iter().zip(&node.positional_args) {
            if let Some(source) = arg.as_output_reference() {
                let (_, producer) = func_ids.get(source).ok_or_else(|| {
                    WorkerError::ValidationFailed(format!(
                        "'{name}' references unknown function '{source}'"
                    ))
                })?;
                let declared = param
                    .ty
                    .ok_or_else(|| WorkerError::MissingAnnotation(param.name.clone()))?;
                let producer_ty = producer
                    .return_type
                    .ok_or_else(|| WorkerError::MissingAnnotation(format!("{source} return type")))?;
                if !return_type_compatible(producer_ty, declared) {
                    return Err(WorkerError::ValidationFailed(format!(
                        "'{name}.{}' expects {declared}, but '{source}' returns {producer_ty}",
                        param.name
                    )));
                }
            } else {
                let declared = param
                    .ty
                    .ok_or_else(|| WorkerError::MissingAnnotation(param.name.clone()))?;
                if !crate::validator::coerces(declared, arg.value_type()) {
                    return Err(WorkerError::ValidationFailed(format!(
                        "'{name}.{}' expects {declared}, got {:?}",
                        param.name,
                        arg.value_type()
                    )));
                }
            }
        }

        for (key, value) in &node.default_args {
            let declared_param = descriptor
                .default_params
                .iter()
                .find(|p| &p.name == key)
                .ok_or_else(|| {
                    WorkerError::ValidationFailed(format!("{name} has no default parameter named '{key}'"))
                })?;
            let declared = declared_param
                .ty
                .ok_or_else(|| WorkerError::MissingAnnotation(key.clone()))?;
            if let Some(source) = value.as_output_reference() {
                let (_, producer) = func_ids.get(source).ok_or_else(|| {
                    WorkerError::ValidationFailed(format!(
                        "'{name}' references unknown function '{source}'"
                    ))
                })?;
                let producer_ty = producer
                    .return_type
                    .ok_or_else(|| WorkerError::MissingAnnotation(format!("{source} return type")))?;
                if !return_type_compatible(producer_ty, declared) {
                    return Err(WorkerError::ValidationFailed(format!(
                        "'{name}.{key}' expects {declared}, but '{source}' returns {producer_ty}"
                    )));
                }
            } else if !crate::validator::coerces(declared, value.value_type()) {
                return Err(WorkerError::ValidationFailed(format!(
                    "'{name}.{key}' expects {declared}, got {:?}",
                    value.value_type()
                )));
            }
        }
    }

    Ok(())
}

pub struct ChainExecutor<'a> {
    pub catalog: &'a Catalog,
    pub procedures: &'a ProcedureRegistry,
    pub cache: &'a mut LruCache<CacheKey, ArgValue>,
    pub stats: &'a mut StatsTable,
}

impl<'a> ChainExecutor<'a> {
    /// Run the full chain starting at `workflow.entry_function`, returning
    /// the terminal node's result (spec.md §4.6 steps 3-5).
    pub fn execute(&mut self, workflow: &Workflow) -> Result<ArgValue> {
        typecheck_workflow(workflow, self.catalog)?;

        let mut results: BTreeMap<String, ArgValue> = BTreeMap::new();
        let mut current = workflow.entry_function.clone();

        loop {
            let node = workflow
                .functions
                .get(&current)
                .ok_or_else(|| WorkerError::ValidationFailed(format!("unknown chain node '{current}'")))?;
            let (func_id, entry) = self
                .catalog
                .find_by_name(&current)
                .ok_or_else(|| WorkerError::ValidationFailed(format!("'{current}' is not registered")))?;
            let func_id = func_id.to_string();
            let descriptor = entry.descriptor.clone();

            let positional = resolve_positional(&node.positional_args, &results)?;
            let defaults = resolve_defaults(&node.default_args, &results)?;
            validator::validate_call(&descriptor, &positional, &defaults)?;

            let key = CacheKey::new(&func_id, &positional, &defaults);
            let result = if self.cache.check(&key) {
                self.cache.get(&key).expect("checked key must be present")
            } else {
                let start = Instant::now();
                let value = self
                    .procedures
                    .invoke(&descriptor.procedure, &positional, &defaults)?;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_call(&func_id, elapsed_ms);
                if node.cache_result {
                    self.cache.put(key, value.clone());
                }
                value
            };

            let next = node.next.clone();
            results.insert(current.clone(), result.clone());

            if next.is_empty() {
                return Ok(result);
            }
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use faas_protocol::types::{DefaultParam, Param, WorkflowNode};
    use faas_protocol::value::ValueType;

    fn add_descriptor() -> faas_protocol::types::FunctionDescriptor {
        faas_protocol::types::FunctionDescriptor {
            name: "add".to_string(),
            positional_params: vec![
                Param { name: "a".into(), ty: Some(ValueType::Int) },
                Param { name: "b".into(), ty: Some(ValueType::Int) },
            ],
            default_params: vec![],
            return_type: Some(ValueType::Int),
            procedure: "sum".to_string(),
        }
    }

    fn scale_descriptor() -> faas_protocol::types::FunctionDescriptor {
        faas_protocol::types::FunctionDescriptor {
            name: "scale".to_string(),
            positional_params: vec![Param { name: "x".into(), ty: Some(ValueType::Float) }],
            default_params: vec![DefaultParam {
                name: "factor".into(),
                ty: Some(ValueType::Float),
                default: ArgValue::Float(2.0),
            }],
            return_type: Some(ValueType::Float),
            procedure: "scale".to_string(),
        }
    }

    fn make_catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.insert_if_absent(
            "add_id".into(),
            CatalogEntry { descriptor: add_descriptor(), registering_client: "client-1".into() },
        );
        cat.insert_if_absent(
            "scale_id".into(),
            CatalogEntry { descriptor: scale_descriptor(), registering_client: "client-1".into() },
        );
        cat
    }

    #[test]
    fn coercion_allows_int_output_into_float_param() {
        let catalog = make_catalog();
        let mut functions = BTreeMap::new();
        functions.insert(
            "add".to_string(),
            WorkflowNode {
                positional_args: vec![ArgValue::Int(5), ArgValue::Int(10)],
                default_args: Default::default(),
                next: "scale".to_string(),
                cache_result: false,
            },
        );
        functions.insert(
            "scale".to_string(),
            WorkflowNode {
                positional_args: vec![ArgValue::Str("$add.output".to_string())],
                default_args: Default::default(),
                next: String::new(),
                cache_result: false,
            },
        );
        let workflow = Workflow { id: "w1".into(), entry_function: "add".into(), functions };

        let procedures = ProcedureRegistry::with_builtins();
        let mut cache = LruCache::new(16);
        let mut stats = StatsTable::new();
        let mut exec = ChainExecutor { catalog: &catalog, procedures: &procedures, cache: &mut cache, stats: &mut stats };
        let result = exec.execute(&workflow).unwrap();
        assert_eq!(result, ArgValue::Float(30.0));
    }

    #[test]
    fn unknown_function_in_workflow_is_validation_failed() {
        let catalog = make_catalog();
        let mut functions = BTreeMap::new();
        functions.insert(
            "ghost".to_string(),
            WorkflowNode {
                positional_args: vec![],
                default_args: Default::default(),
                next: String::new(),
                cache_result: false,
            },
        );
        let workflow = Workflow { id: "w1".into(), entry_function: "ghost".into(), functions };
        let err = typecheck_workflow(&workflow, &catalog).unwrap_err();
        assert!(matches!(err, WorkerError::ValidationFailed(_)));
    }
}
