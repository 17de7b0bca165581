//! The columnar materializer: clean records for one aspect become a
//! `polars::frame::DataFrame` whose schema is derived from the clean
//! schema (§4.4).

use polars::prelude::*;

use crate::error::{Error, Result};
use crate::schema::{CleanFieldType, CleanSchema};
use crate::value::{CleanRecord, CleanValue};

/// Builds a column table for one aspect's clean records.
///
/// Empty input produces a zero-row table with the derived schema; this is
/// not an error, since a replay legitimately may not exercise every
/// aspect.
pub fn materialize_aspect(schema: &CleanSchema, records: &[CleanRecord]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(schema.fields.len());
    for field in schema.fields {
        let series = match field.field_type {
            CleanFieldType::Int => build_int_column(field.name, records),
            CleanFieldType::Float => build_float_column(field.name, records),
            CleanFieldType::Bool => build_bool_column(field.name, records),
            CleanFieldType::Str => build_str_column(field.name, records),
            CleanFieldType::Enum(_) => build_categorical_column(field.name, records)?,
        };
        columns.push(series);
    }

    DataFrame::new(columns).map_err(|e| Error::Transformation {
        aspect: schema.aspect.to_string(),
        row_index: None,
        reason: format!("failed to assemble column table: {e}"),
    })
}

fn build_int_column(name: &str, records: &[CleanRecord]) -> Series {
    let values: Vec<Option<i64>> = records
        .iter()
        .map(|r| r.get(name).and_then(CleanValue::as_i64))
        .collect();
    Series::new(name, values)
}

fn build_float_column(name: &str, records: &[CleanRecord]) -> Series {
    let values: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.get(name).and_then(CleanValue::as_f64))
        .collect();
    Series::new(name, values)
}

fn build_bool_column(name: &str, records: &[CleanRecord]) -> Series {
    let values: Vec<Option<bool>> = records
        .iter()
        .map(|r| match r.get(name) {
            Some(CleanValue::Bool(b)) => Some(*b),
            _ => None,
        })
        .collect();
    Series::new(name, values)
}

fn build_str_column(name: &str, records: &[CleanRecord]) -> Series {
    let values: Vec<Option<String>> = records
        .iter()
        .map(|r| match r.get(name) {
            Some(CleanValue::Str(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();
    Series::new(name, values)
}

fn build_categorical_column(name: &str, records: &[CleanRecord]) -> Result<Series> {
    let values: Vec<Option<&str>> = records
        .iter()
        .map(|r| match r.get(name) {
            Some(CleanValue::Enum(symbol)) => Some(*symbol),
            _ => None,
        })
        .collect();
    Series::new(name, values)
        .cast(&DataType::Categorical(None))
        .map_err(|e| Error::Transformation {
            aspect: name.to_string(),
            row_index: None,
            reason: format!("cannot derive categorical dtype for '{name}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    #[test]
    fn empty_input_yields_zero_row_table() {
        let registry = SchemaRegistry::build().unwrap();
        let schema = registry.clean_schema_for("team_stats").unwrap();
        let df = materialize_aspect(schema, &[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), schema.fields.len());
    }

    #[test]
    fn materializes_mixed_columns() {
        let registry = SchemaRegistry::build().unwrap();
        let schema = registry.clean_schema_for("commands_log").unwrap();
        let record = CleanRecord {
            aspect: "commands_log",
            fields: vec![
                ("frame", CleanValue::Int(1)),
                ("teamId", CleanValue::Int(0)),
                ("unitId", CleanValue::Int(5)),
                ("cmd_id", CleanValue::Int(2)),
                ("cmd_name", CleanValue::Enum("ATTACK")),
                ("cmd_tag", CleanValue::Int(1)),
                ("target_unit_id", CleanValue::Null),
                ("x", CleanValue::Int(1)),
                ("y", CleanValue::Int(2)),
                ("z", CleanValue::Int(3)),
            ],
        };
        let df = materialize_aspect(schema, &[record]).unwrap();
        assert_eq!(df.height(), 1);
        assert!(df.column("cmd_name").is_ok());
    }
}
