//! Transformation catalog.
//!
//! Every transformation is a variant of [`TransformKind`]; its applicable
//! column types, precondition and output arity live in one table returned by
//! [`TransformKind::spec`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::ColumnType;

/// All available column transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Natural logarithm
    Log,
    /// Square root
    Sqrt,
    /// Z-score: (x - mean) / std
    #[serde(alias = "standardized")]
    Standardize,
    /// Rescale to [0, 1]
    #[serde(rename = "minmax", alias = "min_max")]
    MinMax,
    /// Remove rows where the column is null
    #[serde(alias = "dropNulls", alias = "remove_nulls", alias = "dropna")]
    DropNulls,
    /// Replace nulls with the column mean
    #[serde(alias = "fillMean", alias = "fillna_mean")]
    FillMean,
    /// Replace nulls with the column median
    #[serde(alias = "fillMedian", alias = "fillna_median")]
    FillMedian,
    /// Category -> integer code, first-seen order
    #[serde(alias = "labelEncode", alias = "label_encoding")]
    LabelEncode,
    /// One 0/1 column per category
    #[serde(alias = "oneHotEncode", alias = "one_hot_encoding")]
    OneHotEncode,
}

/// Which column types a transformation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Numeric,
    Categorical,
    Any,
}

impl Applicability {
    pub fn accepts(self, column_type: ColumnType) -> bool {
        match self {
            Applicability::Any => true,
            Applicability::Numeric => column_type == ColumnType::Numeric,
            Applicability::Categorical => column_type == ColumnType::Categorical,
        }
    }
}

/// Number of columns a transformation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// Mutates the row count instead of adding a column.
    None,
    Single,
    /// One column per distinct category.
    PerCategory,
}

/// Catalog entry for one transformation kind.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: TransformKind,
    pub applies_to: Applicability,
    /// Human-readable precondition, `"-"` when there is none.
    pub requirement: &'static str,
    pub arity: Arity,
    /// Default output name suffix for single-output kinds.
    pub suffix: Option<&'static str>,
    pub description: &'static str,
}

impl TransformKind {
    pub const ALL: [TransformKind; 9] = [
        TransformKind::Log,
        TransformKind::Sqrt,
        TransformKind::Standardize,
        TransformKind::MinMax,
        TransformKind::DropNulls,
        TransformKind::FillMean,
        TransformKind::FillMedian,
        TransformKind::LabelEncode,
        TransformKind::OneHotEncode,
    ];

    pub fn spec(self) -> KindSpec {
        use Applicability as A;

        let (applies_to, requirement, arity, suffix, description) = match self {
            TransformKind::Log => (A::Numeric, "all values > 0", Arity::Single, Some("log"), "Natural logarithm"),
            TransformKind::Sqrt => (A::Numeric, "all values >= 0", Arity::Single, Some("sqrt"), "Square root"),
            TransformKind::Standardize => (
                A::Numeric,
                "std > 0",
                Arity::Single,
                Some("standardized"),
                "Zero mean, unit variance",
            ),
            TransformKind::MinMax => (A::Numeric, "max > min", Arity::Single, Some("minmax"), "Scale to [0, 1]"),
            TransformKind::DropNulls => (A::Any, "-", Arity::None, None, "Remove rows where the column is null"),
            TransformKind::FillMean => (
                A::Numeric,
                ">= 1 non-null value",
                Arity::Single,
                Some("fill_mean"),
                "Replace nulls with the mean",
            ),
            TransformKind::FillMedian => (
                A::Numeric,
                ">= 1 non-null value",
                Arity::Single,
                Some("fill_median"),
                "Replace nulls with the median",
            ),
            TransformKind::LabelEncode => (
                A::Categorical,
                "-",
                Arity::Single,
                Some("label"),
                "Category to integer code (first-seen order)",
            ),
            TransformKind::OneHotEncode => (
                A::Categorical,
                "cardinality <= limit",
                Arity::PerCategory,
                None,
                "One binary column per category",
            ),
        };

        KindSpec {
            kind: self,
            applies_to,
            requirement,
            arity,
            suffix,
            description,
        }
    }

    /// Wire name (`snake_case`).
    pub fn as_str(self) -> &'static str {
        match self {
            TransformKind::Log => "log",
            TransformKind::Sqrt => "sqrt",
            TransformKind::Standardize => "standardize",
            TransformKind::MinMax => "minmax",
            TransformKind::DropNulls => "drop_nulls",
            TransformKind::FillMean => "fill_mean",
            TransformKind::FillMedian => "fill_median",
            TransformKind::LabelEncode => "label_encode",
            TransformKind::OneHotEncode => "one_hot_encode",
        }
    }

    /// Kinds valid for a column type, in catalog order.
    pub fn available_for(column_type: ColumnType) -> Vec<TransformKind> {
        Self::ALL
            .into_iter()
            .filter(|k| k.spec().applies_to.accepts(column_type))
            .collect()
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    /// Accepts the wire name and the camelCase spelling (`dropNulls`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|k| k.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("unknown transformation '{s}'"))
    }
}

/// A violated transformation precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    AllPositive,
    AllNonNegative,
    PositiveStd,
    PositiveRange,
    AnyNonNull,
    MaxCardinality { max: usize, actual: usize },
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::AllPositive => f.write_str("all values > 0"),
            Requirement::AllNonNegative => f.write_str("all values >= 0"),
            Requirement::PositiveStd => f.write_str("a standard deviation > 0"),
            Requirement::PositiveRange => f.write_str("max > min"),
            Requirement::AnyNonNull => f.write_str("at least one non-null value"),
            Requirement::MaxCardinality { max, actual } => {
                write!(f, "at most {max} distinct categories (found {actual})")
            }
        }
    }
}

/// Markdown table of the catalog, for CLI help and API discovery.
pub fn catalog_description() -> String {
    let mut out = String::from(
        "Available transformations:\n\n\
         | Kind | Column type | Requirement | Outputs | Description |\n\
         |------|-------------|-------------|---------|-------------|\n",
    );

    for kind in TransformKind::ALL {
        let spec = kind.spec();
        let applies = match spec.applies_to {
            Applicability::Numeric => "numeric",
            Applicability::Categorical => "categorical",
            Applicability::Any => "any",
        };
        let outputs = match (spec.arity, spec.suffix) {
            (Arity::None, _) => "0 (drops rows)".to_string(),
            (Arity::Single, Some(suffix)) => format!("1 ({{column}}_{suffix})"),
            (Arity::Single, None) => "1".to_string(),
            (Arity::PerCategory, _) => "N ({column}_{category})".to_string(),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            kind, applies, spec.requirement, outputs, spec.description
        ));
    }

    out
}
