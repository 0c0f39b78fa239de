//! Dataset store.
//!
//! Owns the current [`Dataset`] behind a reader/writer lock. Loads and
//! mutations take the write lock; every read operation holds one read lock
//! for its whole duration, so multi-step reads see a stable row count.
//!
//! ```rust,ignore
//! use datasmith::store::DatasetStore;
//!
//! let store = DatasetStore::new();
//! store.load(table, &HashMap::new())?;
//! let dataset = store.read()?;
//! println!("{} rows", dataset.row_count());
//! ```

pub mod registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{Cell, Column, ColumnDescriptor, ColumnType, Table};
use crate::transform::history::TransformRecord;
use crate::transform::TransformKind;

pub use registry::ColumnRegistry;

// =============================================================================
// Dataset
// =============================================================================

/// The table plus its column registry.
///
/// `columns[i]` holds the cells of `registry` entry `i`; every column has
/// exactly `row_count` cells.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: Uuid,
    loaded_at: DateTime<Utc>,
    registry: ColumnRegistry,
    columns: Vec<Vec<Cell>>,
    row_count: usize,
    history: Vec<TransformRecord>,
}

/// Summary returned by [`DatasetStore::load`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub dataset_id: Uuid,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub column_types: BTreeMap<String, ColumnType>,
}

/// Immutable, owned view of some columns.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub row_count: usize,
    pub descriptors: Vec<ColumnDescriptor>,
    pub table: Table,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            loaded_at: Utc::now(),
            registry: ColumnRegistry::new(),
            columns: Vec::new(),
            row_count: 0,
            history: Vec::new(),
        }
    }
}

impl Dataset {
    /// Build a dataset from a table, classifying each column from the hints
    /// or by inference. All columns start selected.
    pub fn from_table(table: Table, type_hints: &HashMap<String, ColumnType>) -> StoreResult<Self> {
        if table.columns.is_empty() {
            return Err(StoreError::NoData);
        }

        let names: HashSet<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        if let Some(unknown) = type_hints.keys().find(|k| !names.contains(k.as_str())) {
            return Err(StoreError::UnknownColumn(unknown.clone()));
        }

        let row_count = table.row_count();
        let mut registry = ColumnRegistry::new();
        let mut columns = Vec::with_capacity(table.columns.len());

        for column in table.columns {
            if column.len() != row_count {
                return Err(StoreError::LengthMismatch {
                    column: column.name,
                    expected: row_count,
                    actual: column.cells.len(),
                });
            }

            let column_type = match type_hints.get(&column.name) {
                Some(ColumnType::Numeric) => {
                    if let Some(Cell::Text(value)) = column.cells.iter().find(|c| matches!(c, Cell::Text(_))) {
                        return Err(StoreError::IncompatibleType {
                            column: column.name,
                            expected: ColumnType::Numeric,
                            value: value.clone(),
                        });
                    }
                    ColumnType::Numeric
                }
                Some(ColumnType::Categorical) => ColumnType::Categorical,
                None => column.infer_type(),
            };

            registry.insert(ColumnDescriptor::original(column.name, column_type))?;
            columns.push(column.cells);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            registry,
            columns,
            row_count,
            history: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn descriptor(&self, name: &str) -> StoreResult<&ColumnDescriptor> {
        self.registry.get(name)
    }

    pub fn cells(&self, name: &str) -> StoreResult<&[Cell]> {
        let position = self.registry.position(name)?;
        Ok(&self.columns[position])
    }

    /// Numeric view of a column: `None` for nulls and non-numeric cells.
    pub fn numeric_values(&self, name: &str) -> StoreResult<Vec<Option<f64>>> {
        Ok(self.cells(name)?.iter().map(Cell::as_f64).collect())
    }

    pub fn history(&self) -> &[TransformRecord] {
        &self.history
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset_id: self.id,
            row_count: self.row_count,
            column_names: self.registry.names(),
            column_types: self
                .registry
                .iter()
                .map(|d| (d.name.clone(), d.column_type))
                .collect(),
        }
    }

    /// Resolve names to descriptors, failing on the first unknown name.
    pub fn resolve(&self, columns: &[String]) -> StoreResult<Vec<&ColumnDescriptor>> {
        columns.iter().map(|name| self.registry.get(name)).collect()
    }

    /// Resolve names and keep only the selected columns.
    ///
    /// An empty request is an [`StoreError::EmptySelection`] for `operation`.
    pub fn selected(&self, columns: &[String], operation: &str) -> StoreResult<Vec<&ColumnDescriptor>> {
        if columns.is_empty() {
            return Err(StoreError::EmptySelection {
                operation: operation.to_string(),
            });
        }
        Ok(self
            .resolve(columns)?
            .into_iter()
            .filter(|d| d.selected)
            .collect())
    }

    /// Names of every selected column, in registry order.
    pub fn selected_names(&self) -> Vec<String> {
        self.registry
            .iter()
            .filter(|d| d.selected)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Owned view restricted to `columns` (all columns when `None`).
    pub fn snapshot(&self, columns: Option<&[String]>) -> StoreResult<Snapshot> {
        let descriptors: Vec<ColumnDescriptor> = match columns {
            Some(names) => self.resolve(names)?.into_iter().cloned().collect(),
            None => self.registry.iter().cloned().collect(),
        };
        let table = self.table_of(&descriptors, 0..self.row_count)?;
        Ok(Snapshot {
            row_count: self.row_count,
            descriptors,
            table,
        })
    }

    /// First `n` rows of the requested columns (all when `None`).
    pub fn head(&self, n: usize, columns: Option<&[String]>) -> StoreResult<Table> {
        let descriptors: Vec<ColumnDescriptor> = match columns {
            Some(names) => self.resolve(names)?.into_iter().cloned().collect(),
            None => self.registry.iter().cloned().collect(),
        };
        self.table_of(&descriptors, 0..n.min(self.row_count))
    }

    /// Selected columns, in registry insertion order.
    pub fn export_selected(&self) -> Table {
        let columns = self
            .registry
            .iter()
            .zip(&self.columns)
            .filter(|(d, _)| d.selected)
            .map(|(d, cells)| Column::new(d.name.clone(), cells.clone()))
            .collect();
        Table::new(columns)
    }

    fn table_of(&self, descriptors: &[ColumnDescriptor], rows: std::ops::Range<usize>) -> StoreResult<Table> {
        let columns = descriptors
            .iter()
            .map(|d| {
                let cells = self.cells(&d.name)?;
                Ok(Column::new(d.name.clone(), cells[rows.clone()].to_vec()))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Table::new(columns))
    }

    // -------------------------------------------------------------------------
    // Mutations (only reachable through a write guard)
    // -------------------------------------------------------------------------

    pub fn set_selected(&mut self, name: &str, selected: bool) -> StoreResult<()> {
        self.registry.set_selected(name, selected)
    }

    /// Append a derived column with provenance; selected by default.
    pub fn register_derived(
        &mut self,
        name: &str,
        source_column: &str,
        transformation: TransformKind,
        column_type: ColumnType,
        values: Vec<Cell>,
    ) -> StoreResult<()> {
        if self.registry.contains(name) {
            return Err(StoreError::DuplicateColumn(name.to_string()));
        }
        if values.len() != self.row_count {
            return Err(StoreError::LengthMismatch {
                column: name.to_string(),
                expected: self.row_count,
                actual: values.len(),
            });
        }
        self.registry.get(source_column)?;
        self.registry.insert(ColumnDescriptor::derived(
            name,
            column_type,
            source_column,
            transformation,
        ))?;
        self.columns.push(values);
        Ok(())
    }

    /// Keep only the rows whose mask entry is `true`, across every column.
    ///
    /// The new column storage is built completely before it replaces the
    /// old one. Returns the number of removed rows.
    pub fn retain_rows(&mut self, keep: &[bool]) -> StoreResult<usize> {
        if keep.len() != self.row_count {
            return Err(StoreError::LengthMismatch {
                column: "<row mask>".to_string(),
                expected: self.row_count,
                actual: keep.len(),
            });
        }

        let survivors: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();

        let columns: Vec<Vec<Cell>> = self
            .columns
            .iter()
            .map(|cells| survivors.iter().map(|&i| cells[i].clone()).collect())
            .collect();

        let removed = self.row_count - survivors.len();
        self.columns = columns;
        self.row_count = survivors.len();
        Ok(removed)
    }

    pub fn push_history(&mut self, record: TransformRecord) {
        self.history.push(record);
    }
}

// =============================================================================
// Store
// =============================================================================

/// Owner of the current dataset.
///
/// Not a process-wide singleton: each [`crate::Engine`] holds its own store.
#[derive(Debug, Default)]
pub struct DatasetStore {
    inner: RwLock<Dataset>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current dataset wholesale.
    pub fn load(&self, table: Table, type_hints: &HashMap<String, ColumnType>) -> StoreResult<DatasetInfo> {
        let dataset = Dataset::from_table(table, type_hints)?;
        let info = dataset.info();
        let mut guard = self
            .inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        *guard = dataset;
        Ok(info)
    }

    /// Shared read access to a loaded dataset.
    pub fn read(&self) -> StoreResult<RwLockReadGuard<'_, Dataset>> {
        let guard = self
            .inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if !guard.is_loaded() {
            return Err(StoreError::NoData);
        }
        Ok(guard)
    }

    /// Exclusive write access to a loaded dataset.
    pub fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Dataset>> {
        let guard = self
            .inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if !guard.is_loaded() {
            return Err(StoreError::NoData);
        }
        Ok(guard)
    }

    pub fn snapshot(&self, columns: Option<&[String]>) -> StoreResult<Snapshot> {
        self.read()?.snapshot(columns)
    }

    pub fn set_selected(&self, name: &str, selected: bool) -> StoreResult<()> {
        self.write()?.set_selected(name, selected)
    }

    pub fn register_derived(
        &self,
        name: &str,
        source_column: &str,
        transformation: TransformKind,
        column_type: ColumnType,
        values: Vec<Cell>,
    ) -> StoreResult<()> {
        self.write()?
            .register_derived(name, source_column, transformation, column_type, values)
    }

    pub fn export_selected(&self) -> StoreResult<Table> {
        Ok(self.read()?.export_selected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::numeric("A", &[Some(1.0), None, Some(3.0)]),
            Column::text("B", &[Some("x"), Some("y"), None]),
        ])
    }

    #[test]
    fn test_load_classifies_and_selects() {
        let store = DatasetStore::new();
        let info = store.load(sample_table(), &HashMap::new()).unwrap();

        assert_eq!(info.row_count, 3);
        assert_eq!(info.column_names, vec!["A", "B"]);
        assert_eq!(info.column_types["A"], ColumnType::Numeric);
        assert_eq!(info.column_types["B"], ColumnType::Categorical);

        let dataset = store.read().unwrap();
        assert!(dataset.registry().iter().all(|d| d.selected && d.derivation.is_none()));
    }

    #[test]
    fn test_load_empty_table_is_no_data() {
        let store = DatasetStore::new();
        let err = store.load(Table::default(), &HashMap::new()).unwrap_err();
        assert_eq!(err, StoreError::NoData);
        assert_eq!(store.read().unwrap_err(), StoreError::NoData);
    }

    #[test]
    fn test_load_rejects_ragged_and_duplicate() {
        let store = DatasetStore::new();
        let ragged = Table::new(vec![
            Column::numeric("A", &[Some(1.0)]),
            Column::numeric("B", &[Some(1.0), Some(2.0)]),
        ]);
        assert!(matches!(
            store.load(ragged, &HashMap::new()),
            Err(StoreError::LengthMismatch { .. })
        ));

        let duplicate = Table::new(vec![
            Column::numeric("A", &[Some(1.0)]),
            Column::numeric("A", &[Some(2.0)]),
        ]);
        assert_eq!(
            store.load(duplicate, &HashMap::new()).unwrap_err(),
            StoreError::DuplicateColumn("A".into())
        );
    }

    #[test]
    fn test_type_hints() {
        let store = DatasetStore::new();
        let hints = HashMap::from([("A".to_string(), ColumnType::Categorical)]);
        let info = store.load(sample_table(), &hints).unwrap();
        assert_eq!(info.column_types["A"], ColumnType::Categorical);

        let bad = HashMap::from([("B".to_string(), ColumnType::Numeric)]);
        assert!(matches!(
            store.load(sample_table(), &bad),
            Err(StoreError::IncompatibleType { .. })
        ));

        let unknown = HashMap::from([("Z".to_string(), ColumnType::Numeric)]);
        assert_eq!(
            store.load(sample_table(), &unknown).unwrap_err(),
            StoreError::UnknownColumn("Z".into())
        );
    }

    #[test]
    fn test_snapshot_restricts_columns() {
        let store = DatasetStore::new();
        store.load(sample_table(), &HashMap::new()).unwrap();

        let snapshot = store.snapshot(Some(&["B".to_string()])).unwrap();
        assert_eq!(snapshot.table.column_names(), vec!["B"]);
        assert_eq!(snapshot.row_count, 3);

        let err = store.snapshot(Some(&["nope".to_string()])).unwrap_err();
        assert_eq!(err, StoreError::UnknownColumn("nope".into()));
    }

    #[test]
    fn test_register_derived_and_export() {
        let store = DatasetStore::new();
        store.load(sample_table(), &HashMap::new()).unwrap();

        store
            .register_derived(
                "A_log",
                "A",
                TransformKind::Log,
                ColumnType::Numeric,
                vec![Cell::Number(0.0), Cell::Null, Cell::Number(1.1)],
            )
            .unwrap();
        let err = store
            .register_derived("A_log", "A", TransformKind::Log, ColumnType::Numeric, vec![Cell::Null; 3])
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateColumn("A_log".into()));

        let short = store.register_derived("A_x", "A", TransformKind::Log, ColumnType::Numeric, vec![]);
        assert!(matches!(short, Err(StoreError::LengthMismatch { .. })));

        store.set_selected("B", false).unwrap();
        let exported = store.export_selected().unwrap();
        assert_eq!(exported.column_names(), vec!["A", "A_log"]);

        let dataset = store.read().unwrap();
        let derivation = dataset.descriptor("A_log").unwrap().derivation.clone().unwrap();
        assert_eq!(derivation.source_column, "A");
        assert_eq!(derivation.transformation, TransformKind::Log);
    }

    #[test]
    fn test_retain_rows_keeps_alignment() {
        let mut dataset = Dataset::from_table(sample_table(), &HashMap::new()).unwrap();
        let removed = dataset.retain_rows(&[true, false, true]).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.cells("A").unwrap(), &[Cell::Number(1.0), Cell::Number(3.0)]);
        assert_eq!(dataset.cells("B").unwrap(), &[Cell::Text("x".into()), Cell::Null]);
    }

    #[test]
    fn test_head_clamps_to_row_count() {
        let dataset = Dataset::from_table(sample_table(), &HashMap::new()).unwrap();
        assert_eq!(dataset.head(10, None).unwrap().row_count(), 3);
        assert_eq!(dataset.head(1, Some(&["A".to_string()])).unwrap().column_names(), vec!["A"]);
    }
}
