//! The row-major packer: little-endian fixed-width row packing for streams
//! whose contract declares `layout: row-major-mixed` (§4.6.4).

use polars::prelude::*;

use super::dtype_code::dtype_code;
use crate::contract::TableOptions;
use crate::error::{Error, Result};

/// One column's packed layout within a row.
#[derive(Debug, Clone)]
pub struct RowMajorColumn {
    /// Column name.
    pub name: String,
    /// The packed (post-contract) dtype.
    pub dtype: String,
    /// The pre-contract dtype, if the contract changed it.
    pub original_dtype: String,
    /// The contract rule kind applied (`"none"`, `"cast"`,
    /// `"static_quantize"`, `"enum_to_int"`).
    pub transform: String,
    /// The null sentinel substituted into this column, if any.
    pub null_encoding: Option<i64>,
}

/// The result of row-major packing a table.
pub struct PackedRows {
    /// The packed row bytes, `num_rows * row_byte_stride` long.
    pub bytes: Vec<u8>,
    /// The byte width of one packed row.
    pub row_byte_stride: usize,
    /// Per-column packing descriptors, in column order.
    pub columns: Vec<RowMajorColumn>,
}

/// Packs every row of `table` into a fixed-width little-endian tuple.
///
/// Precondition: every column is a fixed-width primitive. Any remaining
/// null requires `table_options.null_encoding` to be set; the sentinel is
/// substituted before packing.
pub fn pack_rows(
    table: &DataFrame,
    metadata: &crate::contract::TableMetadata,
    table_options: &TableOptions,
    stream_name: &str,
) -> Result<PackedRows> {
    let mut widths = Vec::with_capacity(table.width());
    let mut columns_desc = Vec::with_capacity(table.width());

    for series in table.get_columns() {
        let width = primitive_width(series.dtype()).ok_or_else(|| Error::OutputGeneration {
            strategy: "row-major".to_string(),
            stream: Some(stream_name.to_string()),
            reason: format!("column '{}' has non-primitive dtype {:?}", series.name(), series.dtype()),
        })?;

        if series.null_count() > 0 && table_options.null_encoding.is_none() {
            return Err(Error::OutputGeneration {
                strategy: "row-major".to_string(),
                stream: Some(stream_name.to_string()),
                reason: format!(
                    "column '{}' has nulls but stream '{stream_name}' declares no null_encoding",
                    series.name()
                ),
            });
        }

        widths.push(width);
        let col_meta = metadata.columns.get(series.name());
        columns_desc.push(RowMajorColumn {
            name: series.name().to_string(),
            dtype: dtype_code(series.dtype()),
            original_dtype: col_meta
                .map(|m| dtype_code(&m.original_dtype))
                .unwrap_or_else(|| dtype_code(series.dtype())),
            transform: col_meta.map(transform_kind).unwrap_or_else(|| "none".to_string()),
            null_encoding: table_options.null_encoding,
        });
    }

    let row_byte_stride: usize = widths.iter().sum();
    let num_rows = table.height();
    let mut bytes = Vec::with_capacity(num_rows * row_byte_stride);

    let sentinel = table_options.null_encoding.unwrap_or(0);
    for row_index in 0..num_rows {
        for series in table.get_columns() {
            let dtype = series.dtype();
            match series.get(row_index) {
                Ok(AnyValue::Null) => push_sentinel(&mut bytes, dtype, sentinel),
                Ok(value) => push_primitive(&mut bytes, dtype, &value)?,
                Err(e) => {
                    return Err(Error::OutputGeneration {
                        strategy: "row-major".to_string(),
                        stream: Some(stream_name.to_string()),
                        reason: format!("failed to read row {row_index}: {e}"),
                    })
                }
            }
        }
    }

    Ok(PackedRows {
        bytes,
        row_byte_stride,
        columns: columns_desc,
    })
}

fn transform_kind(meta: &crate::contract::ColumnMetadata) -> String {
    use crate::contract::ColumnTransform;
    match meta.transform {
        ColumnTransform::None => "none".to_string(),
        ColumnTransform::Cast => "cast".to_string(),
        ColumnTransform::StaticQuantize { .. } => "static_quantize".to_string(),
        ColumnTransform::EnumToInt { .. } => "enum_to_int".to_string(),
    }
}

fn primitive_width(dtype: &DataType) -> Option<usize> {
    match dtype {
        DataType::Int8 | DataType::UInt8 | DataType::Boolean => Some(1),
        DataType::Int16 | DataType::UInt16 => Some(2),
        DataType::Int32 | DataType::UInt32 | DataType::Float32 => Some(4),
        DataType::Int64 | DataType::UInt64 | DataType::Float64 => Some(8),
        _ => None,
    }
}

fn push_sentinel(buf: &mut Vec<u8>, dtype: &DataType, sentinel: i64) {
    match dtype {
        DataType::Int8 => buf.push(sentinel as i8 as u8),
        DataType::UInt8 | DataType::Boolean => buf.push(sentinel as u8),
        DataType::Int16 => buf.extend_from_slice(&(sentinel as i16).to_le_bytes()),
        DataType::UInt16 => buf.extend_from_slice(&(sentinel as u16).to_le_bytes()),
        DataType::Int32 => buf.extend_from_slice(&(sentinel as i32).to_le_bytes()),
        DataType::UInt32 => buf.extend_from_slice(&(sentinel as u32).to_le_bytes()),
        DataType::Int64 => buf.extend_from_slice(&sentinel.to_le_bytes()),
        DataType::UInt64 => buf.extend_from_slice(&(sentinel as u64).to_le_bytes()),
        DataType::Float32 => buf.extend_from_slice(&(sentinel as f32).to_le_bytes()),
        DataType::Float64 => buf.extend_from_slice(&(sentinel as f64).to_le_bytes()),
        _ => unreachable!("non-primitive dtype reached push_sentinel"),
    }
}

fn push_primitive(buf: &mut Vec<u8>, dtype: &DataType, value: &AnyValue) -> Result<()> {
    match (dtype, value) {
        (DataType::Int8, AnyValue::Int8(v)) => buf.push(*v as u8),
        (DataType::UInt8, AnyValue::UInt8(v)) => buf.push(*v),
        (DataType::Boolean, AnyValue::Boolean(v)) => buf.push(if *v { 1 } else { 0 }),
        (DataType::Int16, AnyValue::Int16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt16, AnyValue::UInt16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Int32, AnyValue::Int32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt32, AnyValue::UInt32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Int64, AnyValue::Int64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt64, AnyValue::UInt64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Float32, AnyValue::Float32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Float64, AnyValue::Float64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        _ => {
            return Err(Error::OutputGeneration {
                strategy: "row-major".to_string(),
                stream: None,
                reason: format!("value {value:?} does not match packed dtype {dtype:?}"),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ColumnMetadata, ColumnTransform, TableMetadata};
    use std::collections::HashMap;

    fn metadata_for(df: &DataFrame) -> TableMetadata {
        let mut columns = HashMap::new();
        for series in df.get_columns() {
            columns.insert(
                series.name().to_string(),
                ColumnMetadata {
                    original_dtype: series.dtype().clone(),
                    transform: ColumnTransform::None,
                },
            );
        }
        TableMetadata {
            columns,
            table: TableOptions::default(),
        }
    }

    #[test]
    fn packs_rows_to_expected_length() {
        let df = DataFrame::new(vec![
            Series::new("a", &[1u32, 2, 3]),
            Series::new("b", &[10u32, 20, 30]),
        ])
        .unwrap();
        let metadata = metadata_for(&df);
        let options = TableOptions {
            layout: crate::contract::Layout::RowMajorMixed,
            null_encoding: None,
        };
        let packed = pack_rows(&df, &metadata, &options, "s").unwrap();
        assert_eq!(packed.row_byte_stride, 8);
        assert_eq!(packed.bytes.len(), 3 * 8);
    }

    #[test]
    fn s3_null_encoding_scenario() {
        let df = DataFrame::new(vec![Series::new("attacker_unit_id", &[Some(1u32), None])]).unwrap();
        let metadata = metadata_for(&df);
        let options = TableOptions {
            layout: crate::contract::Layout::RowMajorMixed,
            null_encoding: Some(0),
        };
        let packed = pack_rows(&df, &metadata, &options, "unit_events").unwrap();
        assert_eq!(packed.row_byte_stride, 4);
        assert_eq!(&packed.bytes[4..8], &0u32.to_le_bytes());
    }
}
