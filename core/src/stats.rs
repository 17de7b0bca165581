//! The derived-stat registry and invocation contract.
//!
//! A stat is a pure function over the set of materialized aspect tables
//! that returns a new table; failures are logged and the stat is dropped,
//! the replay continues (§7, `Aggregation`). This crate ships the
//! registry and two illustrative stats grounded in `original_source/`;
//! the full statistic catalogue is out of scope (§1).

use std::collections::HashMap;

use polars::prelude::*;
use rmpv::Value as MsgpackValue;

use crate::encode::column_encoder::any_value_to_msgpack;
use crate::error::{Error, Result};

/// A derived-stat function: takes the full set of materialized aspect
/// tables, keyed by aspect name, and returns a new table.
pub type StatFn = fn(&HashMap<String, DataFrame>) -> Result<DataFrame>;

/// A process-wide registry of named stat functions.
pub struct StatRegistry {
    stats: HashMap<&'static str, StatFn>,
}

impl StatRegistry {
    /// Builds the registry with the stats this crate ships.
    pub fn build() -> Self {
        let mut stats: HashMap<&'static str, StatFn> = HashMap::new();
        stats.insert("army_value_timeline", army_value_timeline as StatFn);
        Self { stats }
    }

    /// Looks up a stat function by name.
    pub fn get(&self, name: &str) -> Option<StatFn> {
        self.stats.get(name).copied()
    }

    /// Every registered stat name.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.stats.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Invokes `name` against `tables`, wrapping any failure as
    /// [`Error::Aggregation`] per the recovery policy in §7.
    pub fn invoke(&self, name: &str, tables: &HashMap<String, DataFrame>) -> Result<DataFrame> {
        let stat_fn = self.get(name).ok_or_else(|| Error::Aggregation {
            stat: name.to_string(),
            reason: "no stat registered under this name".to_string(),
        })?;
        stat_fn(tables).map_err(|e| Error::Aggregation {
            stat: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A per-frame, per-team economic proxy for army strength: the sum of a
/// team's current metal and energy reserves at each frame, grounded on
/// `team_stats`'s `metal_current`/`energy_current` columns.
fn army_value_timeline(tables: &HashMap<String, DataFrame>) -> Result<DataFrame> {
    let team_stats = tables.get("team_stats").ok_or_else(|| Error::Aggregation {
        stat: "army_value_timeline".to_string(),
        reason: "requires the 'team_stats' table".to_string(),
    })?;

    let lazy = team_stats
        .clone()
        .lazy()
        .select([
            col("frame"),
            col("team_id"),
            (col("metal_current") + col("energy_current")).alias("army_value"),
        ])
        .sort(["frame", "team_id"], SortMultipleOptions::default());

    lazy.collect().map_err(|e| Error::Aggregation {
        stat: "army_value_timeline".to_string(),
        reason: format!("projection failed: {e}"),
    })
}

/// Builds a `{key_column_value: [value_column_values…]}` mapping from a
/// side table, used to pack the hybrid encoder's `defs_map` static asset
/// (§4.6.1) from the unit-definitions side table (`defs.csv`: `id, name,
/// translatedHumanName`).
pub fn to_lookup_map(table: &DataFrame, key_column: &str, value_columns: &[&str]) -> Result<MsgpackValue> {
    let key_series = table.column(key_column).map_err(|e| Error::Aggregation {
        stat: "to_lookup_map".to_string(),
        reason: format!("missing key column '{key_column}': {e}"),
    })?;

    let mut entries = Vec::with_capacity(table.height());
    for row_index in 0..table.height() {
        let key = key_series.get(row_index).map_err(|e| Error::Aggregation {
            stat: "to_lookup_map".to_string(),
            reason: format!("failed to read key at row {row_index}: {e}"),
        })?;
        let key_value = any_value_to_msgpack(key);
        let key_string = match &key_value {
            MsgpackValue::String(s) => s.as_str().unwrap_or_default().to_string(),
            other => other.to_string(),
        };

        let mut values = Vec::with_capacity(value_columns.len());
        for value_column in value_columns {
            let series = table.column(value_column).map_err(|e| Error::Aggregation {
                stat: "to_lookup_map".to_string(),
                reason: format!("missing value column '{value_column}': {e}"),
            })?;
            let value = series.get(row_index).map_err(|e| Error::Aggregation {
                stat: "to_lookup_map".to_string(),
                reason: format!("failed to read '{value_column}' at row {row_index}: {e}"),
            })?;
            values.push(any_value_to_msgpack(value));
        }

        entries.push((MsgpackValue::from(key_string), MsgpackValue::Array(values)));
    }

    Ok(MsgpackValue::Map(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn army_value_timeline_sums_metal_and_energy() {
        let team_stats = DataFrame::new(vec![
            Series::new("frame", &[1i64, 1]),
            Series::new("team_id", &[0i64, 1]),
            Series::new("metal_current", &[10.0f64, 20.0]),
            Series::new("energy_current", &[5.0f64, 2.0]),
        ])
        .unwrap();
        let mut tables = HashMap::new();
        tables.insert("team_stats".to_string(), team_stats);

        let registry = StatRegistry::build();
        let result = registry.invoke("army_value_timeline", &tables).unwrap();
        let values: Vec<Option<f64>> = result.column("army_value").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(15.0), Some(22.0)]);
    }

    #[test]
    fn missing_table_is_reported_as_aggregation_error() {
        let registry = StatRegistry::build();
        let err = registry.invoke("army_value_timeline", &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Aggregation { .. }));
    }

    #[test]
    fn to_lookup_map_builds_expected_shape() {
        let defs = DataFrame::new(vec![
            Series::new("id", &[1i64, 2]),
            Series::new("name", &["armcom".to_string(), "corcom".to_string()]),
        ])
        .unwrap();
        let map = to_lookup_map(&defs, "id", &["name"]).unwrap();
        match map {
            MsgpackValue::Map(entries) => assert_eq!(entries.len(), 2),
            _ => panic!("expected a map"),
        }
    }
}
