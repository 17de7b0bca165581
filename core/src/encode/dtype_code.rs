//! Maps Polars dtypes to the exact descriptor strings used in schema
//! documents (§6, "Numeric dtype codes").

use polars::prelude::*;

/// Renders `dtype` using the descriptor's fixed vocabulary.
pub fn dtype_code(dtype: &DataType) -> String {
    match dtype {
        DataType::Int8 => "Int8".to_string(),
        DataType::UInt8 => "UInt8".to_string(),
        DataType::Int16 => "Int16".to_string(),
        DataType::UInt16 => "UInt16".to_string(),
        DataType::Int32 => "Int32".to_string(),
        DataType::UInt32 => "UInt32".to_string(),
        DataType::Int64 => "Int64".to_string(),
        DataType::UInt64 => "UInt64".to_string(),
        DataType::Float32 => "Float32".to_string(),
        DataType::Float64 => "Float64".to_string(),
        DataType::Boolean => "Boolean".to_string(),
        DataType::Utf8 => "Utf8".to_string(),
        DataType::Categorical(_) => "Utf8".to_string(),
        DataType::List(inner) => format!("List[{}]", dtype_code(inner)),
        DataType::Struct(fields) => {
            let inner = fields
                .iter()
                .map(|f| format!("{}:{}", f.name(), dtype_code(f.data_type())))
                .collect::<Vec<_>>()
                .join(",");
            format!("Struct[{inner}]")
        }
        other => format!("{other:?}"),
    }
}
