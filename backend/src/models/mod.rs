//! Domain models shared by every engine component.
//!
//! - [`Cell`] - A single scalar value (number, text or null)
//! - [`ColumnType`] - Semantic type of a column (numeric or categorical)
//! - [`Derivation`] / [`ColumnDescriptor`] - Column provenance and selection
//! - [`Column`] / [`Table`] - Ordered, named, equal-length columns

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transform::TransformKind;

// =============================================================================
// Cell
// =============================================================================

/// A single scalar cell.
///
/// Serialized untagged: `null`, a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Missing value.
    Null,
    /// Finite floating point value.
    Number(f64),
    /// Free text / category label.
    Text(String),
}

impl Cell {
    /// Build a numeric cell, mapping NaN and infinities to [`Cell::Null`].
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Null
        }
    }

    /// Build a cell from an optional number.
    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Cell::number).unwrap_or(Cell::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric value, if this cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Category label used by categorical operations.
    ///
    /// Numbers are rendered the same way they are written to CSV, so a
    /// numeric column treated as categorical groups `1` and `1.0` together.
    pub fn category_key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// =============================================================================
// Column metadata
// =============================================================================

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => f.write_str("numeric"),
            ColumnType::Categorical => f.write_str("categorical"),
        }
    }
}

/// Where a derived column came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    /// Column the transformation read from.
    pub source_column: String,
    /// Transformation that produced the column.
    pub transformation: TransformKind,
}

/// Registry entry for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    /// `None` for columns that came from the loaded table.
    pub derivation: Option<Derivation>,
    pub selected: bool,
}

impl ColumnDescriptor {
    /// Descriptor for an original (non-derived) column, selected.
    pub fn original(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            derivation: None,
            selected: true,
        }
    }

    /// Descriptor for a derived column, selected.
    pub fn derived(
        name: impl Into<String>,
        column_type: ColumnType,
        source_column: impl Into<String>,
        transformation: TransformKind,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            derivation: Some(Derivation {
                source_column: source_column.into(),
                transformation,
            }),
            selected: true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.column_type == ColumnType::Numeric
    }
}

// =============================================================================
// Table
// =============================================================================

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Column of numbers; `None` entries become nulls.
    pub fn numeric(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        Self::new(name, values.iter().map(|v| Cell::from_option(*v)).collect())
    }

    /// Column of text values; `None` entries become nulls.
    pub fn text(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::new(
            name,
            values
                .iter()
                .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Null))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Infer the semantic type: numeric iff every non-null cell is a number.
    pub fn infer_type(&self) -> ColumnType {
        if self.cells.iter().all(|c| !matches!(c, Cell::Text(_))) {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

/// An ordered sequence of named columns.
///
/// This is the exchange format between the engine and its collaborators
/// (CSV parser, exporter, HTTP layer). The store validates shape on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a table from a header row and row-major cells.
    ///
    /// Short rows are padded with nulls, extra cells are ignored.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in &mut columns {
                column.cells.push(cells.next().unwrap_or(Cell::Null));
            }
        }

        Self { columns }
    }

    /// Number of rows (length of the first column, 0 if there is none).
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row-major view of the cells, used by the CSV writer.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count()).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_normalizes_non_finite() {
        assert_eq!(Cell::number(f64::NAN), Cell::Null);
        assert_eq!(Cell::number(f64::INFINITY), Cell::Null);
        assert_eq!(Cell::number(1.5), Cell::Number(1.5));
    }

    #[test]
    fn test_category_key_formats_integers() {
        assert_eq!(Cell::Number(3.0).category_key().as_deref(), Some("3"));
        assert_eq!(Cell::Number(2.5).category_key().as_deref(), Some("2.5"));
        assert_eq!(Cell::Null.category_key(), None);
    }

    #[test]
    fn test_infer_type() {
        let numeric = Column::numeric("a", &[Some(1.0), None, Some(2.0)]);
        assert_eq!(numeric.infer_type(), ColumnType::Numeric);

        let text = Column::text("b", &[Some("x"), None]);
        assert_eq!(text.infer_type(), ColumnType::Categorical);
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Text("x".into())],
                vec![Cell::Number(2.0)],
            ],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns[1].cells[1], Cell::Null);
    }

    #[test]
    fn test_cell_json_untagged() {
        let cells: Vec<Cell> = serde_json::from_str(r#"[1.5, "x", null]"#).unwrap();
        assert_eq!(cells, vec![Cell::Number(1.5), Cell::Text("x".into()), Cell::Null]);
    }
}
