//! The value transformer: dequantization and enum interning, raw records to
//! clean records (§4.3).

use log::warn;

use crate::enums::intern;
use crate::error::{Error, Result};
use crate::schema::SchemaRegistry;
use crate::value::{CleanRecord, CleanValue, RawRecord, RawValue};

/// Transforms one raw record into its clean counterpart.
///
/// Dequantization is applied before enum interning (an enum-coded field is
/// never also dequantized, so the two passes never touch the same field),
/// and the clean schema is validated only after both passes, since only
/// then does every field hold its final clean type.
pub fn transform_record(
    registry: &SchemaRegistry,
    record: &RawRecord,
    row_index: usize,
) -> Result<CleanRecord> {
    let aspect = record.aspect;
    let clean_schema = registry.clean_schema_for(aspect).ok_or_else(|| Error::Transformation {
        aspect: aspect.to_string(),
        row_index: Some(row_index),
        reason: "no clean schema registered".to_string(),
    })?;

    let dequant_by_field: std::collections::HashMap<&str, f64> = registry
        .dequantization_rules_for(aspect)
        .map(|r| (r.raw_field, r.divisor))
        .collect();
    let enum_by_field: std::collections::HashMap<&str, (&'static str, &'static str)> = registry
        .enum_rules_for(aspect)
        .map(|r| (r.raw_field, (r.clean_field, r.enum_kind)))
        .collect();

    let mut staged: Vec<(&'static str, CleanValue)> = Vec::with_capacity(record.fields.len());
    for (name, value) in &record.fields {
        if let Some((clean_field, enum_kind)) = enum_by_field.get(name) {
            let clean_value = match value {
                RawValue::Null => CleanValue::Null,
                RawValue::Int(code) => match intern(enum_kind, *code) {
                    Some(symbol) => CleanValue::Enum(symbol),
                    None => {
                        warn!(
                            "aspect '{aspect}' row {row_index}: unknown code {code} for enum kind \
                             '{enum_kind}' on field '{name}'; emitting null"
                        );
                        CleanValue::Null
                    }
                },
                other => {
                    return Err(Error::Transformation {
                        aspect: aspect.to_string(),
                        row_index: Some(row_index),
                        reason: format!("field '{name}' is enum-mapped but holds {other:?}"),
                    })
                }
            };
            staged.push((clean_field, clean_value));
            continue;
        }

        if let Some(divisor) = dequant_by_field.get(name) {
            let clean_value = match value {
                RawValue::Null => CleanValue::Null,
                RawValue::Int(raw) => CleanValue::Float(*raw as f64 / divisor),
                other => {
                    return Err(Error::Transformation {
                        aspect: aspect.to_string(),
                        row_index: Some(row_index),
                        reason: format!("field '{name}' is dequantized but holds {other:?}"),
                    })
                }
            };
            staged.push((name, clean_value));
            continue;
        }

        staged.push((name, clean_value_passthrough(value)));
    }

    validate_against_clean_schema(clean_schema, &staged, aspect, row_index)?;

    Ok(CleanRecord { aspect, fields: staged })
}

fn clean_value_passthrough(value: &RawValue) -> CleanValue {
    match value {
        RawValue::Null => CleanValue::Null,
        RawValue::Int(v) => CleanValue::Int(*v),
        RawValue::Float(v) => CleanValue::Float(*v),
        RawValue::Str(v) => CleanValue::Str(v.clone()),
        RawValue::Bool(v) => CleanValue::Bool(*v),
    }
}

fn validate_against_clean_schema(
    schema: &crate::schema::CleanSchema,
    fields: &[(&'static str, CleanValue)],
    aspect: &str,
    row_index: usize,
) -> Result<()> {
    use crate::schema::CleanFieldType;

    for descriptor in schema.fields {
        let value = fields
            .iter()
            .find(|(n, _)| *n == descriptor.name)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Transformation {
                aspect: aspect.to_string(),
                row_index: Some(row_index),
                reason: format!("clean record is missing field '{}'", descriptor.name),
            })?;

        if value.is_null() {
            if descriptor.optional {
                continue;
            }
            return Err(Error::Transformation {
                aspect: aspect.to_string(),
                row_index: Some(row_index),
                reason: format!("field '{}' is required but null after transform", descriptor.name),
            });
        }

        let matches = matches!(
            (descriptor.field_type, value),
            (CleanFieldType::Int, CleanValue::Int(_))
                | (CleanFieldType::Float, CleanValue::Float(_))
                | (CleanFieldType::Str, CleanValue::Str(_))
                | (CleanFieldType::Bool, CleanValue::Bool(_))
                | (CleanFieldType::Enum(_), CleanValue::Enum(_))
        );
        if !matches {
            return Err(Error::Transformation {
                aspect: aspect.to_string(),
                row_index: Some(row_index),
                reason: format!(
                    "field '{}' expected {:?}, got {:?}",
                    descriptor.name, descriptor.field_type, value
                ),
            });
        }
    }
    Ok(())
}

/// Transforms every record of an aspect, short-circuiting on the first
/// error (skip-on-error row dropping happens upstream in the decoder;
/// transformation failures are never individually skippable — §7).
pub fn transform_aspect(registry: &SchemaRegistry, records: &[RawRecord]) -> Result<Vec<CleanRecord>> {
    records
        .iter()
        .enumerate()
        .map(|(row_index, record)| transform_record(registry, record, row_index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::build().unwrap()
    }

    fn raw_record(aspect: &'static str, fields: Vec<(&'static str, RawValue)>) -> RawRecord {
        RawRecord { aspect, fields }
    }

    #[test]
    fn dequantizes_team_stats_fields() {
        let registry = registry();
        let mut fields = vec![
            ("frame", RawValue::Int(1)),
            ("team_id", RawValue::Int(0)),
            ("metal_used", RawValue::Int(123)),
        ];
        for (name, _) in crate::schema::raw::raw_schema_for("team_stats").unwrap().fields[3..]
            .iter()
            .map(|f| (f.name, ()))
        {
            fields.push((name, RawValue::Int(456)));
        }
        let record = raw_record("team_stats", fields);
        let clean = transform_record(&registry, &record, 0).unwrap();
        assert_eq!(clean.get("metal_used").unwrap().as_f64(), Some(12.3));
    }

    #[test]
    fn interns_known_enum_code() {
        let registry = registry();
        let record = raw_record(
            "unit_events",
            vec![
                ("frame", RawValue::Int(1)),
                ("unit_id", RawValue::Int(1)),
                ("unitDefID", RawValue::Null),
                ("unit_team_id", RawValue::Int(0)),
                ("x", RawValue::Int(0)),
                ("y", RawValue::Int(0)),
                ("z", RawValue::Null),
                ("attacker_unit_id", RawValue::Null),
                ("attacker_unit_def_id", RawValue::Null),
                ("attacker_team_id", RawValue::Null),
                ("event_type", RawValue::Int(3)),
                ("old_team_id", RawValue::Null),
                ("new_team_id", RawValue::Null),
                ("builder_id", RawValue::Null),
                ("factory_queue_len", RawValue::Null),
            ],
        );
        let clean = transform_record(&registry, &record, 0).unwrap();
        assert_eq!(clean.get("event_type").unwrap(), &CleanValue::Enum("DESTROYED"));
    }

    #[test]
    fn unknown_enum_code_becomes_null_not_error() {
        let registry = registry();
        let record = raw_record(
            "unit_events",
            vec![
                ("frame", RawValue::Int(1)),
                ("unit_id", RawValue::Int(1)),
                ("unitDefID", RawValue::Null),
                ("unit_team_id", RawValue::Int(0)),
                ("x", RawValue::Int(0)),
                ("y", RawValue::Int(0)),
                ("z", RawValue::Null),
                ("attacker_unit_id", RawValue::Null),
                ("attacker_unit_def_id", RawValue::Null),
                ("attacker_team_id", RawValue::Null),
                ("event_type", RawValue::Int(999)),
                ("old_team_id", RawValue::Null),
                ("new_team_id", RawValue::Null),
                ("builder_id", RawValue::Null),
                ("factory_queue_len", RawValue::Null),
            ],
        );
        let clean = transform_record(&registry, &record, 0).unwrap();
        assert_eq!(clean.get("event_type").unwrap(), &CleanValue::Null);
    }
}
