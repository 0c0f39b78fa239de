//! Engine configuration.
//!
//! Defaults match the behaviour of the web application; every field can be
//! overridden from the environment (or a `.env` file):
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `DATASMITH_MAX_ONE_HOT_CATEGORIES` | `max_one_hot_categories` | 10 |
//! | `DATASMITH_HISTOGRAM_BINS` | `histogram_bins` | 30 |
//! | `DATASMITH_MAX_BAR_CATEGORIES` | `max_bar_categories` | 30 |
//! | `DATASMITH_MAX_PIE_SLICES` | `max_pie_slices` | 10 |
//! | `DATASMITH_CHART_WIDTH` | `chart_width` | 800 |
//! | `DATASMITH_CHART_HEIGHT` | `chart_height` | 600 |
//! | `DATASMITH_HEAD_ROWS` | `head_rows` | 5 |
//! | `DATASMITH_STANDARDIZE_PROJECTION` | `standardize_projection` | true |
//! | `DATASMITH_PORT` | `server_port` | 3000 |

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::render::RenderOptions;
use crate::transform::TransformOptions;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Largest category count `one_hot_encode` accepts.
    pub max_one_hot_categories: usize,
    /// Histogram bins (0 = Sturges' rule).
    pub histogram_bins: usize,
    pub max_bar_categories: usize,
    pub max_pie_slices: usize,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Default row count of `head_preview`.
    pub head_rows: usize,
    /// Z-score columns before projecting.
    pub standardize_projection: bool,
    pub server_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_one_hot_categories: 10,
            histogram_bins: 30,
            max_bar_categories: 30,
            max_pie_slices: 10,
            chart_width: 800,
            chart_height: 600,
            head_rows: 5,
            standardize_projection: true,
            server_port: 3000,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `DATASMITH_*` variables, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        override_with(&lookup, "DATASMITH_MAX_ONE_HOT_CATEGORIES", &mut config.max_one_hot_categories)?;
        override_with(&lookup, "DATASMITH_HISTOGRAM_BINS", &mut config.histogram_bins)?;
        override_with(&lookup, "DATASMITH_MAX_BAR_CATEGORIES", &mut config.max_bar_categories)?;
        override_with(&lookup, "DATASMITH_MAX_PIE_SLICES", &mut config.max_pie_slices)?;
        override_with(&lookup, "DATASMITH_CHART_WIDTH", &mut config.chart_width)?;
        override_with(&lookup, "DATASMITH_CHART_HEIGHT", &mut config.chart_height)?;
        override_with(&lookup, "DATASMITH_HEAD_ROWS", &mut config.head_rows)?;
        override_with(&lookup, "DATASMITH_STANDARDIZE_PROJECTION", &mut config.standardize_projection)?;
        override_with(&lookup, "DATASMITH_PORT", &mut config.server_port)?;

        Ok(config)
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            max_one_hot_categories: self.max_one_hot_categories,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.chart_width,
            height: self.chart_height,
            histogram_bins: self.histogram_bins,
            max_bar_categories: self.max_bar_categories,
            max_pie_slices: self.max_pie_slices,
        }
    }
}

fn override_with<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) -> Result<(), ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    *field = trimmed.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.transform_options().max_one_hot_categories, 10);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DATASMITH_MAX_ONE_HOT_CATEGORIES", "12"),
            ("DATASMITH_STANDARDIZE_PROJECTION", "false"),
            ("DATASMITH_PORT", " 8080 "),
            ("DATASMITH_HEAD_ROWS", ""),
        ]))
        .unwrap();
        assert_eq!(config.max_one_hot_categories, 12);
        assert!(!config.standardize_projection);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.head_rows, 5);
    }

    #[test]
    fn test_invalid_value() {
        let err = EngineConfig::from_lookup(lookup(&[("DATASMITH_CHART_WIDTH", "wide")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "DATASMITH_CHART_WIDTH".into(),
                value: "wide".into(),
            }
        );
    }

    #[test]
    fn test_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"histogramBins": 0}"#).unwrap();
        assert_eq!(config.histogram_bins, 0);
        assert_eq!(config.chart_width, 800);
    }
}
