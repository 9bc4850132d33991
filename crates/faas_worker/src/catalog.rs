//! The Worker's local function catalog (spec.md §3 "Function (at a
//! Worker)").

use faas_protocol::types::FunctionDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub descriptor: FunctionDescriptor,
    pub registering_client: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, func_id: &str) -> bool {
        self.entries.contains_key(func_id)
    }

    pub fn get(&self, func_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(func_id)
    }

    /// Insert a freshly-registered function. Returns `false` without
    /// mutating state if the `func_id` already exists (spec.md §4.4
    /// register semantics: `no_action`).
    pub fn insert_if_absent(&mut self, func_id: String, entry: CatalogEntry) -> bool {
        if self.entries.contains_key(&func_id) {
            return false;
        }
        self.entries.insert(func_id, entry);
        true
    }

    /// Install (or overwrite) an entry during catalog synchronization
    /// (spec.md §4.3 step 5); mutation by sync is explicitly allowed
    /// (spec.md §3 "mutated only by synchronization install").
    pub fn install(&mut self, func_id: String, entry: CatalogEntry) {
        self.entries.insert(func_id, entry);
    }

    pub fn remove(&mut self, func_id: &str) -> Option<CatalogEntry> {
        self.entries.remove(func_id)
    }

    pub fn func_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<(&str, &CatalogEntry)> {
        self.entries
            .iter()
            .find(|(_, e)| e.descriptor.name == name)
            .map(|(id, e)| (id.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faas_protocol::types::FunctionDescriptor;

    fn descriptor(name: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            name: name.to_string(),
            positional_params: vec![],
            default_params: vec![],
            return_type: Some(faas_protocol::value::ValueType::Int),
            procedure: name.to_string(),
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut cat = Catalog::new();
        let entry = CatalogEntry {
            descriptor: descriptor("add"),
            registering_client: "client-1".into(),
        };
        assert!(cat.insert_if_absent("id1".into(), entry.clone()));
        assert!(!cat.insert_if_absent("id1".into(), entry));
        assert_eq!(cat.len(), 1);
    }

    #[test]
    fn remove_then_find_returns_none() {
        let mut cat = Catalog::new();
        cat.insert_if_absent(
            "id1".into(),
            CatalogEntry {
                descriptor: descriptor("add"),
                registering_client: "client-1".into(),
            },
        );
        cat.remove("id1");
        assert!(cat.get("id1").is_none());
    }
}
