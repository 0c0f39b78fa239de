//! Transformation history.
//!
//! Every applied transformation leaves a [`TransformRecord`] on the dataset.
//! The history is cleared when a new dataset is loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TransformKind;
use crate::stats::ValueStats;

/// One applied transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRecord {
    pub timestamp: DateTime<Utc>,
    pub transformation: TransformKind,
    pub column: String,
    pub created_columns: Vec<String>,
    pub rows_removed: usize,
    /// Source column before the transformation.
    pub before: ValueStats,
    /// First created column, or the filtered source for `drop_nulls`.
    pub after: Option<ValueStats>,
}

/// Serialized form of the history, ending with an export marker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExport<'a> {
    pub dataset_id: String,
    pub exported_at: DateTime<Utc>,
    pub steps: &'a [TransformRecord],
    pub final_row_count: usize,
    pub final_columns: Vec<String>,
}

impl<'a> HistoryExport<'a> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_json_shape() {
        let record = TransformRecord {
            timestamp: Utc::now(),
            transformation: TransformKind::Sqrt,
            column: "A".into(),
            created_columns: vec!["A_sqrt".into()],
            rows_removed: 0,
            before: ValueStats::Numeric {
                count: 1,
                mean: Some(4.0),
                std: None,
                min: Some(4.0),
                max: Some(4.0),
            },
            after: None,
        };
        let steps = vec![record];
        let export = HistoryExport {
            dataset_id: "id".into(),
            exported_at: Utc::now(),
            steps: &steps,
            final_row_count: 1,
            final_columns: vec!["A".into(), "A_sqrt".into()],
        };

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["steps"][0]["transformation"], "sqrt");
        assert_eq!(json["steps"][0]["createdColumns"][0], "A_sqrt");
        assert_eq!(json["finalRowCount"], 1);
    }
}
