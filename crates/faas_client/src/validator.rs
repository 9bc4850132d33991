//! Client-side structural workflow validation (spec.md §4.7,
//! "Client-side (structural)"). This runs before a `chain_exec` request
//! ever leaves the client; it catches shape errors that don't need a
//! registered function's signature to detect, leaving the deep
//! type/arity checks to the Worker (`faas_worker::chain::typecheck_workflow`).

use crate::error::{ClientError, Result};
use faas_protocol::types::Workflow;
use std::collections::BTreeSet;

/// `unknown fields are rejected` (spec.md §4.7) is already enforced by
/// `WorkflowNode`'s `#[serde(deny_unknown_fields)]`; this only needs to
/// be reached through `validate_from_json`, which parses before
/// validating.
pub fn validate_from_json(json: &str) -> Result<Workflow> {
    let workflow: Workflow =
        serde_json::from_str(json).map_err(|e| ClientError::InvalidWorkflow(e.to_string()))?;
    validate_structural(&workflow)?;
    Ok(workflow)
}

pub fn validate_structural(workflow: &Workflow) -> Result<()> {
    if workflow.id.is_empty() {
        return Err(ClientError::InvalidWorkflow("id must not be empty".into()));
    }
    if workflow.entry_function.is_empty() {
        return Err(ClientError::InvalidWorkflow(
            "entry_function must not be empty".into(),
        ));
    }
    if !workflow.functions.contains_key(&workflow.entry_function) {
        return Err(ClientError::InvalidWorkflow(format!(
            "entry_function '{}' is not a declared function",
            workflow.entry_function
        )));
    }

    for (name, node) in &workflow.functions {
        if node.next == *name {
            return Err(ClientError::InvalidWorkflow(format!(
                "'{name}' has next == itself (self-loop)"
            )));
        }
        if !node.next.is_empty() && !workflow.functions.contains_key(&node.next) {
            return Err(ClientError::InvalidWorkflow(format!(
                "'{name}'.next references undeclared function '{}'",
                node.next
            )));
        }
        for arg in &node.positional_args {
            check_reference(&workflow.functions, arg, name)?;
        }
        for arg in node.default_args.values() {
            check_reference(&workflow.functions, arg, name)?;
        }
    }

    if !workflow.functions.values().any(|n| n.next.is_empty()) {
        return Err(ClientError::InvalidWorkflow(
            "no function has next = \"\" (no terminal node)".into(),
        ));
    }

    let mut visited = BTreeSet::new();
    let mut current = workflow.entry_function.clone();
    loop {
        if !visited.insert(current.clone()) {
            return Err(ClientError::InvalidWorkflow(format!(
                "cycle detected following next-chain at '{current}'"
            )));
        }
        let next = &workflow.functions[&current].next;
        if next.is_empty() {
            break;
        }
        current = next.clone();
    }
    if visited.len() != workflow.functions.len() {
        let unreached: Vec<_> = workflow
            .functions
            .keys()
            .filter(|name| !visited.contains(*name))
            .cloned()
            .collect();
        return Err(ClientError::InvalidWorkflow(format!(
            "not reachable from entry_function: {}",
            unreached.join(", ")
        )));
    }

    Ok(())
}

fn check_reference(
    functions: &std::collections::BTreeMap<String, faas_protocol::types::WorkflowNode>,
    arg: &faas_protocol::ArgValue,
    owner: &str,
) -> Result<()> {
    if let Some(target) = arg.as_output_reference() {
        if !functions.contains_key(target) {
            return Err(ClientError::InvalidWorkflow(format!(
                "'{owner}' references undeclared function '{target}' via \"$...output\""
            )));
        }
    }
    Ok(())
}
