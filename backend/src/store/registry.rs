//! Column registry - one descriptor per column, in insertion order.

use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};
use crate::models::ColumnDescriptor;

/// Ordered registry of column descriptors with name lookup.
///
/// The position of a descriptor is also the position of its cells in the
/// owning [`super::Dataset`], which keeps the column/descriptor bijection
/// structural.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    entries: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor and return its position.
    pub fn insert(&mut self, descriptor: ColumnDescriptor) -> StoreResult<usize> {
        if self.index.contains_key(&descriptor.name) {
            return Err(StoreError::DuplicateColumn(descriptor.name));
        }
        let position = self.entries.len();
        self.index.insert(descriptor.name.clone(), position);
        self.entries.push(descriptor);
        Ok(position)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> StoreResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownColumn(name.to_string()))
    }

    pub fn get(&self, name: &str) -> StoreResult<&ColumnDescriptor> {
        let position = self.position(name)?;
        Ok(&self.entries[position])
    }

    /// Toggle the selection flag of a column.
    pub fn set_selected(&mut self, name: &str, selected: bool) -> StoreResult<()> {
        let position = self.position(name)?;
        self.entries[position].selected = selected;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnType;
    use crate::transform::TransformKind;

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = ColumnRegistry::new();
        registry.insert(ColumnDescriptor::original("a", ColumnType::Numeric)).unwrap();
        registry.insert(ColumnDescriptor::original("b", ColumnType::Categorical)).unwrap();

        assert_eq!(registry.position("b").unwrap(), 1);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.get("a").unwrap().selected);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ColumnRegistry::new();
        registry.insert(ColumnDescriptor::original("a", ColumnType::Numeric)).unwrap();
        let err = registry
            .insert(ColumnDescriptor::derived("a", ColumnType::Numeric, "a", TransformKind::Log))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateColumn("a".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_selected_unknown() {
        let mut registry = ColumnRegistry::new();
        let err = registry.set_selected("missing", false).unwrap_err();
        assert_eq!(err, StoreError::UnknownColumn("missing".into()));
    }
}
