//! The recursive column encoder: turns one materialized column into one or
//! more named binary blobs for the columnar physical layout (§4.6.5).

use log::warn;
use polars::prelude::*;
use rmpv::Value as MsgpackValue;

use super::dtype_code::dtype_code;
use crate::error::{Error, Result};

/// The schema-document entry describing how a column's blob(s) are laid
/// out, mirroring the `column_entry` shapes in §3.
#[derive(Debug, Clone)]
pub enum ColumnEntryDescriptor {
    /// A fixed-width primitive: one data blob.
    Primitive {
        /// Column name.
        name: String,
        /// Descriptor dtype string.
        dtype: String,
        /// Key of the raw data blob.
        data_key: String,
    },
    /// A UTF-8 string column: offsets + data blobs.
    Utf8 {
        /// Column name.
        name: String,
        /// Always `"Utf8"`.
        dtype: String,
        /// Key of the concatenated UTF-8 bytes blob.
        data_key: String,
        /// Key of the `uint32` offsets blob.
        offsets_key: String,
    },
    /// A list of a primitive inner dtype: offsets + flattened data blobs.
    ListOfPrimitive {
        /// Column name.
        name: String,
        /// Descriptor dtype string, e.g. `"List[Int32]"`.
        dtype: String,
        /// Key of the flattened inner-element data blob.
        data_key: String,
        /// Key of the `uint32` outer offsets blob.
        offsets_key: String,
    },
    /// A list of structs: outer offsets plus one recursive entry per field.
    ListOfStruct {
        /// Column name.
        name: String,
        /// Descriptor dtype string.
        dtype: String,
        /// Key of the `uint32` outer offsets blob.
        list_offsets_key: String,
        /// Recursive per-field descriptors, flattened across the outer list.
        struct_fields: Vec<ColumnEntryDescriptor>,
    },
    /// A last-resort fallback: the column's cell list packed as a single
    /// msgpack blob.
    Opaque {
        /// Column name.
        name: String,
        /// Descriptor dtype string.
        dtype: String,
        /// Key of the msgpack blob.
        mpk_key: String,
    },
}

/// The result of encoding one column: its descriptor plus the named blobs
/// it produced.
pub struct EncodedColumn {
    /// The descriptor entry for this column.
    pub descriptor: ColumnEntryDescriptor,
    /// Blob name → bytes, to be written (and, for the hybrid/columnar
    /// encoders, zstd-compressed) by the caller.
    pub blobs: Vec<(String, Vec<u8>)>,
}

/// Encodes one column into its blob(s) and descriptor.
///
/// `null_encoding` is the table-wide sentinel declared by the contract, if
/// any; required for non-float primitive columns that contain nulls.
pub fn encode_column(series: &Series, base: &str, null_encoding: Option<i64>) -> Result<EncodedColumn> {
    match series.dtype() {
        DataType::Int8
        | DataType::UInt8
        | DataType::Int16
        | DataType::UInt16
        | DataType::Int32
        | DataType::UInt32
        | DataType::Int64
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean => encode_primitive(series, base, null_encoding),
        DataType::Utf8 => encode_utf8(series, base),
        DataType::Categorical(_) => {
            let as_utf8 = series.cast(&DataType::Utf8).map_err(|e| Error::OutputGeneration {
                strategy: "columnar".to_string(),
                stream: Some(base.to_string()),
                reason: format!("failed to render categorical column '{base}' as Utf8: {e}"),
            })?;
            encode_utf8(&as_utf8, base)
        }
        DataType::List(inner) if inner.is_numeric() || matches!(**inner, DataType::Boolean) => {
            encode_list_of_primitive(series, base)
        }
        DataType::List(inner) if matches!(**inner, DataType::Struct(_)) => {
            encode_list_of_struct(series, base, null_encoding)
        }
        other => encode_opaque_fallback(series, base, other),
    }
}

fn encode_primitive(series: &Series, base: &str, null_encoding: Option<i64>) -> Result<EncodedColumn> {
    let dtype = series.dtype().clone();
    let is_float = matches!(dtype, DataType::Float32 | DataType::Float64);
    let has_nulls = series.null_count() > 0;

    if has_nulls && !is_float && null_encoding.is_none() {
        return Err(Error::OutputGeneration {
            strategy: "columnar".to_string(),
            stream: Some(base.to_string()),
            reason: format!(
                "column '{base}' has nulls but no null_encoding was declared for its non-float dtype"
            ),
        });
    }

    let mut bytes = Vec::with_capacity(series.len() * dtype.to_physical().size());
    for value in series.iter() {
        match value {
            AnyValue::Null => {
                if is_float {
                    bytes.extend_from_slice(&f64::NAN.to_le_bytes()[..dtype.to_physical().size()]);
                } else {
                    push_int_le(&mut bytes, &dtype, null_encoding.unwrap_or(0));
                }
            }
            other => push_any_value_le(&mut bytes, &dtype, &other)?,
        }
    }

    let data_key = format!("{base}_bin");
    Ok(EncodedColumn {
        descriptor: ColumnEntryDescriptor::Primitive {
            name: base.to_string(),
            dtype: dtype_code(&dtype),
            data_key: data_key.clone(),
        },
        blobs: vec![(data_key, bytes)],
    })
}

fn push_int_le(buf: &mut Vec<u8>, dtype: &DataType, value: i64) {
    match dtype {
        DataType::Int8 => buf.push(value as i8 as u8),
        DataType::UInt8 => buf.push(value as u8),
        DataType::Int16 => buf.extend_from_slice(&(value as i16).to_le_bytes()),
        DataType::UInt16 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
        DataType::Int32 => buf.extend_from_slice(&(value as i32).to_le_bytes()),
        DataType::UInt32 => buf.extend_from_slice(&(value as u32).to_le_bytes()),
        DataType::Int64 => buf.extend_from_slice(&value.to_le_bytes()),
        DataType::UInt64 => buf.extend_from_slice(&(value as u64).to_le_bytes()),
        DataType::Boolean => buf.push(if value != 0 { 1 } else { 0 }),
        _ => unreachable!("non-integer dtype passed to push_int_le"),
    }
}

fn push_any_value_le(buf: &mut Vec<u8>, dtype: &DataType, value: &AnyValue) -> Result<()> {
    match (dtype, value) {
        (DataType::Int8, AnyValue::Int8(v)) => buf.push(*v as u8),
        (DataType::UInt8, AnyValue::UInt8(v)) => buf.push(*v),
        (DataType::Int16, AnyValue::Int16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt16, AnyValue::UInt16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Int32, AnyValue::Int32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt32, AnyValue::UInt32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Int64, AnyValue::Int64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::UInt64, AnyValue::UInt64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Float32, AnyValue::Float32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Float64, AnyValue::Float64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (DataType::Boolean, AnyValue::Boolean(v)) => buf.push(if *v { 1 } else { 0 }),
        _ => {
            return Err(Error::OutputGeneration {
                strategy: "columnar".to_string(),
                stream: None,
                reason: format!("value {value:?} does not match declared dtype {dtype:?}"),
            })
        }
    }
    Ok(())
}

fn encode_utf8(series: &Series, base: &str) -> Result<EncodedColumn> {
    let chunked = series.utf8().map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("column '{base}' is not Utf8: {e}"),
    })?;

    let mut offsets = Vec::with_capacity(chunked.len() + 1);
    let mut data = Vec::new();
    offsets.push(0u32);
    for value in chunked.into_iter() {
        // Nulls and empty strings both serialize as a zero-length segment;
        // this crate carries no null bitmap, so the two are indistinguishable
        // on read-back (documented limitation, §9).
        if let Some(s) = value {
            data.extend_from_slice(s.as_bytes());
        }
        offsets.push(data.len() as u32);
    }

    let offsets_key = format!("{base}_offs");
    let data_key = format!("{base}_data");
    let mut offsets_bytes = Vec::with_capacity(offsets.len() * 4);
    for o in &offsets {
        offsets_bytes.extend_from_slice(&o.to_le_bytes());
    }

    Ok(EncodedColumn {
        descriptor: ColumnEntryDescriptor::Utf8 {
            name: base.to_string(),
            dtype: "Utf8".to_string(),
            data_key: data_key.clone(),
            offsets_key: offsets_key.clone(),
        },
        blobs: vec![(offsets_key, offsets_bytes), (data_key, data)],
    })
}

fn encode_list_of_primitive(series: &Series, base: &str) -> Result<EncodedColumn> {
    let list = series.list().map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("column '{base}' is not a list: {e}"),
    })?;
    let inner_dtype = match series.dtype() {
        DataType::List(inner) => (**inner).clone(),
        _ => unreachable!(),
    };
    let is_float = matches!(inner_dtype, DataType::Float32 | DataType::Float64);

    let mut offsets: Vec<u32> = vec![0];
    let mut data = Vec::new();
    for cell in list.into_iter() {
        let inner_series = cell.unwrap_or_else(|| Series::new_empty("", &inner_dtype));
        for value in inner_series.iter() {
            match value {
                AnyValue::Null if is_float => data.extend_from_slice(&f64::NAN.to_le_bytes()[..inner_dtype.to_physical().size()]),
                AnyValue::Null => {
                    return Err(Error::OutputGeneration {
                        strategy: "columnar".to_string(),
                        stream: Some(base.to_string()),
                        reason: format!("column '{base}' has a null inner element in a non-float list"),
                    })
                }
                other => push_any_value_le(&mut data, &inner_dtype, &other)?,
            }
        }
        offsets.push((data.len() / inner_dtype.to_physical().size().max(1)) as u32);
    }

    let offsets_key = format!("{base}_offs");
    let data_key = format!("{base}_data");
    let mut offsets_bytes = Vec::with_capacity(offsets.len() * 4);
    for o in &offsets {
        offsets_bytes.extend_from_slice(&o.to_le_bytes());
    }

    Ok(EncodedColumn {
        descriptor: ColumnEntryDescriptor::ListOfPrimitive {
            name: base.to_string(),
            dtype: dtype_code(series.dtype()),
            data_key: data_key.clone(),
            offsets_key: offsets_key.clone(),
        },
        blobs: vec![(offsets_key, offsets_bytes), (data_key, data)],
    })
}

fn encode_list_of_struct(series: &Series, base: &str, null_encoding: Option<i64>) -> Result<EncodedColumn> {
    let list = series.list().map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("column '{base}' is not a list: {e}"),
    })?;

    let mut list_offsets: Vec<u32> = vec![0];
    let mut running = 0u32;
    for cell in list.into_iter() {
        running += cell.map(|s| s.len() as u32).unwrap_or(0);
        list_offsets.push(running);
    }

    // Flatten one level: each struct field becomes its own column, with
    // values concatenated in outer-list order. `explode` performs exactly
    // this flattening, but also emits one null row per empty/null list
    // cell; those carry no element and must be dropped so the flattened
    // data's length matches the offsets computed above.
    let exploded = series.explode().map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("failed to explode list-of-struct column '{base}': {e}"),
    })?;
    let exploded = exploded.filter(&exploded.is_not_null()).map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("failed to drop empty-list rows from exploded column '{base}': {e}"),
    })?;
    let struct_chunked = exploded.struct_().map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("exploded column '{base}' is not a struct: {e}"),
    })?;

    let mut struct_fields = Vec::new();
    let mut blobs = Vec::new();
    for field_series in struct_chunked.fields() {
        let field_base = format!("{base}__{}", field_series.name());
        let encoded = encode_column(field_series, &field_base, null_encoding)?;
        struct_fields.push(encoded.descriptor);
        blobs.extend(encoded.blobs);
    }

    let list_offsets_key = format!("{base}_list_offs");
    let mut offsets_bytes = Vec::with_capacity(list_offsets.len() * 4);
    for o in &list_offsets {
        offsets_bytes.extend_from_slice(&o.to_le_bytes());
    }
    blobs.push((list_offsets_key.clone(), offsets_bytes));

    Ok(EncodedColumn {
        descriptor: ColumnEntryDescriptor::ListOfStruct {
            name: base.to_string(),
            dtype: dtype_code(series.dtype()),
            list_offsets_key,
            struct_fields,
        },
        blobs,
    })
}

fn encode_opaque_fallback(series: &Series, base: &str, dtype: &DataType) -> Result<EncodedColumn> {
    warn!("column '{base}' has dtype {dtype:?} with no dedicated columnar encoding; falling back to opaque msgpack");

    let values: Vec<MsgpackValue> = series.iter().map(any_value_to_msgpack).collect();
    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, &MsgpackValue::Array(values)).map_err(|e| Error::OutputGeneration {
        strategy: "columnar".to_string(),
        stream: Some(base.to_string()),
        reason: format!("failed to msgpack-encode opaque column '{base}': {e}"),
    })?;

    let mpk_key = format!("{base}_mpk");
    Ok(EncodedColumn {
        descriptor: ColumnEntryDescriptor::Opaque {
            name: base.to_string(),
            dtype: dtype_code(dtype),
            mpk_key: mpk_key.clone(),
        },
        blobs: vec![(mpk_key, bytes)],
    })
}

/// Converts one cell to its msgpack representation. Shared by the opaque
/// fallback path here and by the legacy row-list encoder.
pub fn any_value_to_msgpack(value: AnyValue) -> MsgpackValue {
    match value {
        AnyValue::Null => MsgpackValue::Nil,
        AnyValue::Boolean(b) => MsgpackValue::Boolean(b),
        AnyValue::Int8(v) => MsgpackValue::from(v),
        AnyValue::Int16(v) => MsgpackValue::from(v),
        AnyValue::Int32(v) => MsgpackValue::from(v),
        AnyValue::Int64(v) => MsgpackValue::from(v),
        AnyValue::UInt8(v) => MsgpackValue::from(v),
        AnyValue::UInt16(v) => MsgpackValue::from(v),
        AnyValue::UInt32(v) => MsgpackValue::from(v),
        AnyValue::UInt64(v) => MsgpackValue::from(v),
        AnyValue::Float32(v) => MsgpackValue::from(v),
        AnyValue::Float64(v) => MsgpackValue::from(v),
        AnyValue::Utf8(v) => MsgpackValue::from(v),
        AnyValue::Utf8Owned(v) => MsgpackValue::from(v.as_str()),
        other => MsgpackValue::from(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_without_nulls_encodes_exact_byte_length() {
        let series = Series::new("x", &[1i32, 2, 3]);
        let encoded = encode_column(&series, "x", None).unwrap();
        let (_, bytes) = &encoded.blobs[0];
        assert_eq!(bytes.len(), 3 * 4);
    }

    #[test]
    fn non_float_nulls_without_sentinel_fail() {
        let series = Series::new("x", &[Some(1i32), None, Some(3)]);
        let err = encode_column(&series, "x", None).unwrap_err();
        assert!(matches!(err, Error::OutputGeneration { .. }));
    }

    #[test]
    fn non_float_nulls_with_sentinel_succeed() {
        let series = Series::new("x", &[Some(1i32), None, Some(3)]);
        let encoded = encode_column(&series, "x", Some(0)).unwrap();
        let (_, bytes) = &encoded.blobs[0];
        assert_eq!(bytes.len(), 3 * 4);
        assert_eq!(&bytes[4..8], &0i32.to_le_bytes());
    }

    #[test]
    fn utf8_offsets_are_monotonic_and_bound_data() {
        let series = Series::new("s", &["a", "bb", "ccc"]);
        let encoded = encode_column(&series, "s", None).unwrap();
        match encoded.descriptor {
            ColumnEntryDescriptor::Utf8 { .. } => {}
            _ => panic!("expected Utf8 descriptor"),
        }
        let offsets_bytes = &encoded.blobs[0].1;
        let data_bytes = &encoded.blobs[1].1;
        assert_eq!(offsets_bytes.len(), 4 * 4);
        assert_eq!(data_bytes, b"abbccc");
    }

    fn struct_row(names: &[&str], scores: &[i32]) -> Series {
        StructChunked::new("players", &[Series::new("name", names), Series::new("score", scores)])
            .unwrap()
            .into_series()
    }

    fn empty_struct_row() -> Series {
        StructChunked::new(
            "players",
            &[
                Series::new_empty("name", &DataType::Utf8),
                Series::new_empty("score", &DataType::Int32),
            ],
        )
        .unwrap()
        .into_series()
    }

    fn find_blob<'a>(encoded: &'a EncodedColumn, key: &str) -> &'a [u8] {
        &encoded.blobs.iter().find(|(k, _)| k == key).unwrap().1
    }

    fn read_u32s(bytes: &[u8]) -> Vec<u32> {
        bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect()
    }

    #[test]
    fn list_of_struct_handles_empty_row_without_desyncing_offsets() {
        let row0 = struct_row(&["a"], &[1]);
        let row1 = empty_struct_row();
        let row2 = struct_row(&["bb", "ccc"], &[2, 3]);
        let series = Series::new("players", &[row0, row1, row2]);

        let encoded = encode_column(&series, "players", None).unwrap();
        match &encoded.descriptor {
            ColumnEntryDescriptor::ListOfStruct { struct_fields, .. } => assert_eq!(struct_fields.len(), 2),
            _ => panic!("expected ListOfStruct descriptor"),
        }

        assert_eq!(read_u32s(find_blob(&encoded, "players_list_offs")), vec![0, 1, 1, 3]);
        assert_eq!(read_u32s(find_blob(&encoded, "players__name_offs")), vec![0, 1, 3, 6]);
        assert_eq!(find_blob(&encoded, "players__name_data"), b"abbccc");

        let scores: Vec<i32> = find_blob(&encoded, "players__score_bin")
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(scores, vec![1, 2, 3]);
    }
}
