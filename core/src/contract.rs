//! The output contract engine: declarative per-column transformation rules
//! applied as a single batched lazy-expression projection (§4.5).

use std::collections::HashMap;

use polars::prelude::*;

use crate::enums::enum_kind;
use crate::error::{Error, Result};

/// A per-column output rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Change dtype only.
    Cast {
        /// The target dtype.
        to_type: DataType,
    },
    /// `round(v / scale)` then cast.
    StaticQuantize {
        /// The scale factor; consumers multiply the stored value by this to
        /// recover the original.
        scale: f64,
        /// The target integer dtype.
        to_type: DataType,
    },
    /// Replace a symbolic enum name with its integer code, then cast.
    EnumToInt {
        /// The registered enum kind to resolve names against.
        enum_kind: &'static str,
        /// The target integer dtype.
        to_type: DataType,
    },
}

/// The physical layout a transformed stream is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Each column is serialized independently (the default).
    Columnar,
    /// Rows are packed as fixed-width tuples; requires every column to end
    /// up a fixed-width primitive with no remaining nulls.
    RowMajorMixed,
}

/// Table-wide options carried by a contract.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// The destination physical layout.
    pub layout: Layout,
    /// The sentinel substituted for nulls before row-major packing.
    pub null_encoding: Option<i64>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Columnar,
            null_encoding: None,
        }
    }
}

/// A declarative per-column transformation contract for one output stream.
#[derive(Debug, Clone, Default)]
pub struct OutputContract {
    /// Per-column rules. Columns absent here pass through unchanged.
    pub columns: HashMap<String, Rule>,
    /// Table-wide options.
    pub table_options: TableOptions,
}

/// The process-wide, read-only table of named output contracts, keyed by
/// stat/stream name. Streams absent here fall back to
/// [`OutputContract::default`] (columnar, no column rules).
pub struct ContractRegistry {
    contracts: HashMap<&'static str, OutputContract>,
}

impl ContractRegistry {
    /// Builds the registry with the contracts this pipeline ships.
    pub fn build() -> Self {
        let mut contracts = HashMap::new();

        let mut army_value_columns = HashMap::new();
        army_value_columns.insert("frame".to_string(), Rule::Cast { to_type: DataType::UInt32 });
        army_value_columns.insert("team_id".to_string(), Rule::Cast { to_type: DataType::UInt32 });
        army_value_columns.insert(
            "army_value".to_string(),
            Rule::StaticQuantize {
                scale: 0.1,
                to_type: DataType::UInt32,
            },
        );
        contracts.insert(
            "army_value_timeline",
            OutputContract {
                columns: army_value_columns,
                table_options: TableOptions {
                    layout: Layout::RowMajorMixed,
                    null_encoding: None,
                },
            },
        );

        // Mirrors the generic "everything that has no dedicated aggregation
        // logic" stream: a row-major pass-through of the raw damage log,
        // whose clean schema is already all fixed-width primitives.
        contracts.insert(
            "damage_log",
            OutputContract {
                columns: HashMap::new(),
                table_options: TableOptions {
                    layout: Layout::RowMajorMixed,
                    null_encoding: Some(0),
                },
            },
        );

        Self { contracts }
    }

    /// Looks up the contract registered for `name`, falling back to the
    /// default (columnar, no rules) contract when none is registered.
    pub fn contract_for(&self, name: &str) -> OutputContract {
        self.contracts.get(name).cloned().unwrap_or_default()
    }
}

/// What happened to a single column during contract application.
#[derive(Debug, Clone)]
pub enum ColumnTransform {
    /// No rule applied.
    None,
    /// A plain cast.
    Cast,
    /// A static quantization, recording the scale used.
    StaticQuantize {
        /// The scale factor applied.
        scale: f64,
    },
    /// An enum-to-integer mapping, recording the code→name table actually
    /// used so a consumer can invert it without the enum registry.
    EnumToInt {
        /// The code→name mapping as it stood at contract application time.
        enum_map: HashMap<i64, &'static str>,
    },
}

/// Per-column metadata produced alongside the transformed table.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// The column's dtype before the rule was applied.
    pub original_dtype: DataType,
    /// What transform, if any, was applied.
    pub transform: ColumnTransform,
}

/// The metadata accompanying a transformed table.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    /// Per-column metadata, keyed by column name.
    pub columns: HashMap<String, ColumnMetadata>,
    /// The contract's table-wide options, copied verbatim.
    pub table: TableOptions,
}

/// Applies `contract` to `table`, returning the transformed table and its
/// metadata.
///
/// Every column's rule becomes one `Expr`; all columns are then applied
/// with a single `.select()` so the transform runs in one pass over the
/// table rather than once per column.
pub fn apply_contract(table: &DataFrame, contract: &OutputContract) -> Result<(DataFrame, TableMetadata)> {
    let mut expressions = Vec::with_capacity(table.width());
    let mut columns_meta = HashMap::with_capacity(table.width());

    for column in table.get_columns() {
        let name = column.name().to_string();
        let original_dtype = column.dtype().clone();

        match contract.columns.get(&name) {
            None => {
                expressions.push(col(&name));
                columns_meta.insert(
                    name,
                    ColumnMetadata {
                        original_dtype,
                        transform: ColumnTransform::None,
                    },
                );
            }
            Some(rule) => {
                let expr = build_expr(&name, rule)?;
                expressions.push(expr);
                columns_meta.insert(
                    name,
                    ColumnMetadata {
                        original_dtype,
                        transform: column_transform_for(rule)?,
                    },
                );
            }
        }
    }

    let transformed = table
        .clone()
        .lazy()
        .select(&expressions)
        .collect()
        .map_err(|e| Error::Transformation {
            aspect: "output-contract".to_string(),
            row_index: None,
            reason: format!("contract projection failed: {e}"),
        })?;

    Ok((
        transformed,
        TableMetadata {
            columns: columns_meta,
            table: contract.table_options.clone(),
        },
    ))
}

fn build_expr(name: &str, rule: &Rule) -> Result<Expr> {
    match rule {
        Rule::Cast { to_type } => Ok(col(name).cast(to_type.clone())),
        Rule::StaticQuantize { scale, to_type } => {
            if *scale <= 0.0 || !scale.is_finite() {
                return Err(Error::Transformation {
                    aspect: name.to_string(),
                    row_index: None,
                    reason: format!("quantize scale must be positive and finite, got {scale}"),
                });
            }
            Ok((col(name).cast(DataType::Float64) / lit(*scale))
                .round(0)
                .cast(to_type.clone()))
        }
        Rule::EnumToInt { enum_kind: kind_name, to_type } => {
            let kind = enum_kind(kind_name).ok_or_else(|| Error::Transformation {
                aspect: name.to_string(),
                row_index: None,
                reason: format!("unregistered enum kind '{kind_name}'"),
            })?;
            let mut expr: Expr = lit(NULL);
            for member in kind.members.iter().rev() {
                expr = when(col(name).eq(lit(member.name)))
                    .then(lit(member.code))
                    .otherwise(expr);
            }
            Ok(expr.cast(to_type.clone()))
        }
    }
}

fn column_transform_for(rule: &Rule) -> Result<ColumnTransform> {
    match rule {
        Rule::Cast { .. } => Ok(ColumnTransform::Cast),
        Rule::StaticQuantize { scale, .. } => Ok(ColumnTransform::StaticQuantize { scale: *scale }),
        Rule::EnumToInt { enum_kind: kind_name, .. } => {
            let kind = enum_kind(kind_name).ok_or_else(|| Error::Transformation {
                aspect: kind_name.to_string(),
                row_index: None,
                reason: format!("unregistered enum kind '{kind_name}'"),
            })?;
            let enum_map = kind.members.iter().map(|m| (m.code, m.name)).collect();
            Ok(ColumnTransform::EnumToInt { enum_map })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_quantize_matches_s4_scenario() {
        let df = DataFrame::new(vec![Series::new("army_value", &[0.0, 123.4, 999.9])]).unwrap();
        let mut columns = HashMap::new();
        columns.insert(
            "army_value".to_string(),
            Rule::StaticQuantize {
                scale: 0.1,
                to_type: DataType::UInt32,
            },
        );
        let contract = OutputContract {
            columns,
            table_options: TableOptions::default(),
        };
        let (transformed, metadata) = apply_contract(&df, &contract).unwrap();
        let values: Vec<Option<u32>> = transformed.column("army_value").unwrap().u32().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(0), Some(1234), Some(9999)]);
        match &metadata.columns.get("army_value").unwrap().transform {
            ColumnTransform::StaticQuantize { scale } => assert_eq!(*scale, 0.1),
            _ => panic!("expected StaticQuantize"),
        }
    }

    #[test]
    fn enum_to_int_matches_s2_scenario() {
        let df = DataFrame::new(vec![Series::new("event_type", &["DESTROYED"])]).unwrap();
        let mut columns = HashMap::new();
        columns.insert(
            "event_type".to_string(),
            Rule::EnumToInt {
                enum_kind: "UnitEventsEnum",
                to_type: DataType::UInt32,
            },
        );
        let contract = OutputContract {
            columns,
            table_options: TableOptions::default(),
        };
        let (transformed, metadata) = apply_contract(&df, &contract).unwrap();
        let values: Vec<Option<u32>> = transformed.column("event_type").unwrap().u32().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(3)]);
        match &metadata.columns.get("event_type").unwrap().transform {
            ColumnTransform::EnumToInt { enum_map } => assert_eq!(enum_map.get(&3), Some(&"DESTROYED")),
            _ => panic!("expected EnumToInt"),
        }
    }

    #[test]
    fn registry_resolves_army_value_timeline_to_row_major_mixed() {
        let registry = ContractRegistry::build();
        let contract = registry.contract_for("army_value_timeline");
        assert_eq!(contract.table_options.layout, Layout::RowMajorMixed);
        assert!(matches!(contract.columns.get("army_value"), Some(Rule::StaticQuantize { scale, .. }) if *scale == 0.1));
    }

    #[test]
    fn registry_falls_back_to_default_for_unregistered_stream() {
        let registry = ContractRegistry::build();
        let contract = registry.contract_for("commands_log");
        assert_eq!(contract.table_options.layout, Layout::Columnar);
        assert!(contract.columns.is_empty());
    }
}
