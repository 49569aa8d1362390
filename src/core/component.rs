use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::types::ContentHash;

/// One mesh component of a model: a name unique within its model, paired with
/// the content hash of its raw vertex-buffer bytes.
///
/// Immutable once loaded from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub hash: ContentHash,
}

impl ComponentRef {
    pub fn new(name: impl Into<String>, hash: impl Into<ContentHash>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
        }
    }
}

/// Ordered table of components for one model.
///
/// Insertion order is preserved and significant: it is the processing order of
/// the greedy matching pass. Inserting an already-present name replaces its
/// hash in place (later writer wins, position kept), which is the merge rule
/// when several LOD sources contribute components.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    components: Vec<ComponentRef>,
    name_to_index: HashMap<String, usize>,
}

impl ComponentTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: ComponentRef) {
        match self.name_to_index.get(&component.name) {
            Some(&index) => self.components[index] = component,
            None => {
                self.name_to_index
                    .insert(component.name.clone(), self.components.len());
                self.components.push(component);
            }
        }
    }

    /// Merge another table into this one, in its insertion order.
    pub fn extend(&mut self, other: ComponentTable) {
        for component in other.components {
            self.insert(component);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ComponentRef> {
        self.name_to_index
            .get(name)
            .map(|&index| &self.components[index])
    }

    /// Components in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRef> {
        self.components.iter()
    }

    /// Invert the table into a hash -> name index.
    ///
    /// Duplicate hashes resolve last-writer-wins; that is an input-data
    /// quality issue accepted here, not validated.
    #[must_use]
    pub fn hash_index(&self) -> HashMap<ContentHash, String> {
        self.components
            .iter()
            .map(|c| (c.hash.clone(), c.name.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<ComponentRef> for ComponentTable {
    fn from_iter<I: IntoIterator<Item = ComponentRef>>(iter: I) -> Self {
        let mut table = Self::new();
        for component in iter {
            table.insert(component);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, hash: &str) -> ComponentRef {
        ComponentRef::new(name, ContentHash::new(hash))
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut table = ComponentTable::new();
        table.insert(component("Component 2", "cccc0000"));
        table.insert(component("Component 0", "aaaa0000"));
        table.insert(component("Component 1", "bbbb0000"));

        let names: Vec<&str> = table.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Component 2", "Component 0", "Component 1"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = ComponentTable::new();
        table.insert(component("Component 0", "aaaa0000"));
        table.insert(component("Component 1", "bbbb0000"));
        table.insert(component("Component 0", "dddd0000"));

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("Component 0").unwrap().hash,
            ContentHash::new("dddd0000")
        );
        // Position is kept on replacement
        let names: Vec<&str> = table.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Component 0", "Component 1"]);
    }

    #[test]
    fn test_hash_index_last_writer_wins() {
        let mut table = ComponentTable::new();
        table.insert(component("Component 0", "aaaa0000"));
        table.insert(component("Component 1", "aaaa0000"));

        let index = table.hash_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[&ContentHash::new("aaaa0000")], "Component 1");
    }

    #[test]
    fn test_get_missing() {
        let table = ComponentTable::new();
        assert!(table.get("Component 0").is_none());
        assert!(table.is_empty());
    }
}
