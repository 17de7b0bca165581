//! The streaming decoder: turns an aspect's raw byte blob into a validated
//! sequence of [`RawRecord`]s (§4.2).

use log::warn;
use rmpv::Value as MsgpackValue;

use crate::error::{Error, Result};
use crate::schema::raw::RawSchema;
use crate::schema::SchemaRegistry;
use crate::value::{RawRecord, RawValue};

/// Decodes one aspect's byte blob against the registry's raw schema for
/// that aspect.
///
/// Single-pass: each top-level msgpack value is read, validated, and turned
/// into a [`RawRecord`] before the next is read, so memory use is bounded
/// by one record plus the input buffer (already resident as `bytes`).
///
/// If `aspect` has no registered raw schema, a warning is logged and an
/// empty vector is returned — downstream treats this as "nothing to
/// produce" rather than an error, since an unrecognized `.mpk` file
/// alongside recognized ones is not by itself a fatal condition.
pub fn decode_aspect(
    registry: &SchemaRegistry,
    aspect: &str,
    bytes: &[u8],
    skip_on_error: bool,
) -> Result<Vec<RawRecord>> {
    let Some(schema) = registry.raw_schema_for(aspect) else {
        warn!("no raw schema registered for aspect '{aspect}'; skipping its input blob");
        return Ok(Vec::new());
    };
    // Use the schema's own canonical `'static` name rather than the
    // caller's borrowed one so `RawRecord` never has to own its aspect name.
    let aspect = schema.aspect;

    let top_level = decode_top_level_values(aspect, bytes)?;
    let mut records = Vec::with_capacity(top_level.len());
    for (row_index, value) in top_level.into_iter().enumerate() {
        match decode_record(schema, aspect, row_index, &value) {
            Ok(record) => records.push(record),
            Err(err) if skip_on_error => {
                warn!("skipping aspect '{aspect}' row {row_index}: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

/// Reads every top-level msgpack value out of `bytes` (a concatenation of
/// length-prefixed values, one per record).
fn decode_top_level_values(aspect: &str, bytes: &[u8]) -> Result<Vec<MsgpackValue>> {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut values = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        match rmpv::decode::read_value(&mut cursor) {
            Ok(value) => values.push(value),
            Err(err) => {
                return Err(Error::Decoding {
                    aspect: aspect.to_string(),
                    row_index: values.len(),
                    reason: format!("malformed msgpack value: {err}"),
                })
            }
        }
    }
    Ok(values)
}

fn decode_record(
    schema: &RawSchema,
    aspect: &'static str,
    row_index: usize,
    value: &MsgpackValue,
) -> Result<RawRecord> {
    let raw_fields = value.as_array().ok_or_else(|| Error::SchemaValidation {
        aspect: aspect.to_string(),
        row_index,
        reason: "not a list".to_string(),
    })?;

    if raw_fields.len() > schema.arity() {
        return Err(Error::SchemaValidation {
            aspect: aspect.to_string(),
            row_index,
            reason: format!(
                "arity mismatch: record has {} fields, schema expects at most {}",
                raw_fields.len(),
                schema.arity()
            ),
        });
    }

    let mut fields = Vec::with_capacity(schema.arity());
    for (position, descriptor) in schema.fields.iter().enumerate() {
        let decoded = match raw_fields.get(position) {
            // Missing trailing positions are right-padded with null.
            None => RawValue::Null,
            Some(raw) => match RawValue::from_msgpack(raw, descriptor.scalar_type) {
                Some(v) => v,
                None if raw.is_nil() => RawValue::Null,
                None => {
                    return Err(Error::SchemaValidation {
                        aspect: aspect.to_string(),
                        row_index,
                        reason: format!(
                            "field '{}' expected {:?}, got {:?}",
                            descriptor.name, descriptor.scalar_type, raw
                        ),
                    })
                }
            },
        };

        if decoded.is_null() && !descriptor.optional {
            return Err(Error::SchemaValidation {
                aspect: aspect.to_string(),
                row_index,
                reason: format!("field '{}' is required but null", descriptor.name),
            });
        }

        fields.push((descriptor.name, decoded));
    }

    Ok(RawRecord { aspect, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use rmpv::Value;

    fn encode_records(rows: &[Vec<Value>]) -> Vec<u8> {
        let mut buf = Vec::new();
        for row in rows {
            rmpv::encode::write_value(&mut buf, &Value::Array(row.clone())).unwrap();
        }
        buf
    }

    #[test]
    fn decodes_well_formed_records() {
        let registry = SchemaRegistry::build().unwrap();
        let bytes = encode_records(&[vec![
            Value::from(1),
            Value::from(0),
            Value::from(7),
            Value::from(2),
            Value::from(42),
            Value::Nil,
            Value::from(10),
            Value::from(20),
            Value::from(30),
        ]]);
        let records = decode_aspect(&registry, "commands_log", &bytes, false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("frame").unwrap().as_int(), Some(1));
        assert!(records[0].get("target_unit_id").unwrap().is_null());
    }

    #[test]
    fn right_pads_short_records() {
        let registry = SchemaRegistry::build().unwrap();
        let bytes = encode_records(&[vec![Value::from(1), Value::from(0), Value::from(7)]]);
        let records = decode_aspect(&registry, "commands_log", &bytes, false).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].get("x").unwrap().is_null());
    }

    #[test]
    fn rejects_over_length_records() {
        let registry = SchemaRegistry::build().unwrap();
        let bytes = encode_records(&[vec![Value::from(0); 20]]);
        let err = decode_aspect(&registry, "commands_log", &bytes, false).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }

    #[test]
    fn skip_on_error_drops_bad_rows_only() {
        let registry = SchemaRegistry::build().unwrap();
        let mut bytes = encode_records(&[vec![Value::from(0); 20]]);
        bytes.extend(encode_records(&[vec![
            Value::from(1),
            Value::from(0),
            Value::from(7),
            Value::from(2),
            Value::from(42),
            Value::Nil,
            Value::from(10),
            Value::from(20),
            Value::from(30),
        ]]));
        let records = decode_aspect(&registry, "commands_log", &bytes, true).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unrecognized_aspect_yields_empty() {
        let registry = SchemaRegistry::build().unwrap();
        let records = decode_aspect(&registry, "not_a_real_aspect", &[], false).unwrap();
        assert!(records.is_empty());
    }
}
