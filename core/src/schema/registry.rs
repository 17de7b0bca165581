//! The schema registry: a process-wide, read-only view over the raw/clean
//! aspect catalogue, built once at startup by folding [`super::raw::RAW_SCHEMAS`]
//! into derived dequantization and enum-rule maps (§4.1).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::clean::{clean_schema_for, CleanSchema};
use crate::schema::raw::{raw_schema_for, RawSchema, ScalarType};
use crate::schema::EnumKindName;

/// A dequantization rule for one raw field of one aspect: divide the raw
/// integer by `divisor` to produce the clean float.
#[derive(Debug, Clone, Copy)]
pub struct DequantizationRule {
    /// The aspect this rule applies to.
    pub aspect: &'static str,
    /// The raw field name.
    pub raw_field: &'static str,
    /// The divisor applied during transformation.
    pub divisor: f64,
}

/// An enum-interning rule for one raw field of one aspect: the raw integer
/// code names a member of `enum_kind`, surfaced under `clean_field`.
#[derive(Debug, Clone, Copy)]
pub struct EnumRule {
    /// The aspect this rule applies to.
    pub aspect: &'static str,
    /// The raw field name carrying the integer code.
    pub raw_field: &'static str,
    /// The clean record's field name for the interned symbolic value.
    pub clean_field: &'static str,
    /// The enum kind the code is interned against.
    pub enum_kind: EnumKindName,
}

/// A read-only, introspected view over the aspect catalogue.
///
/// Built once via [`SchemaRegistry::build`] and shared behind an `Arc` (or
/// simply owned, since it is `Sync`) for the lifetime of the process; no
/// module mutates it after construction.
#[derive(Debug)]
pub struct SchemaRegistry {
    raw_by_aspect: HashMap<&'static str, &'static RawSchema>,
    clean_by_aspect: HashMap<&'static str, &'static CleanSchema>,
    dequantization_rules: Vec<DequantizationRule>,
    enum_rules: Vec<EnumRule>,
}

impl SchemaRegistry {
    /// Builds the registry from the compiled-in raw/clean schema catalogues,
    /// validating internal consistency.
    pub fn build() -> Result<Self> {
        let mut raw_by_aspect = HashMap::new();
        for schema in super::raw::RAW_SCHEMAS {
            raw_by_aspect.insert(schema.aspect, schema);
        }

        let mut clean_by_aspect = HashMap::new();
        for schema in super::clean::CLEAN_SCHEMAS {
            clean_by_aspect.insert(schema.aspect, schema);
        }

        let mut dequantization_rules = Vec::new();
        let mut enum_rules = Vec::new();
        for schema in super::raw::RAW_SCHEMAS {
            for field in schema.fields {
                if let Some(divisor) = field.metadata.dequantize_by {
                    if field.scalar_type != ScalarType::Int {
                        return Err(Error::ConfigInconsistent {
                            reason: format!(
                                "aspect '{}' field '{}' is dequantized but not declared Int",
                                schema.aspect, field.name
                            ),
                        });
                    }
                    dequantization_rules.push(DequantizationRule {
                        aspect: schema.aspect,
                        raw_field: field.name,
                        divisor,
                    });
                }
                if let Some((clean_field, enum_kind)) = field.metadata.enum_map {
                    if crate::enums::enum_kind(enum_kind).is_none() {
                        return Err(Error::ConfigInconsistent {
                            reason: format!(
                                "aspect '{}' field '{}' references unregistered enum kind '{}'",
                                schema.aspect, field.name, enum_kind
                            ),
                        });
                    }
                    enum_rules.push(EnumRule {
                        aspect: schema.aspect,
                        raw_field: field.name,
                        clean_field,
                        enum_kind,
                    });
                }
            }
        }

        let registry = Self {
            raw_by_aspect,
            clean_by_aspect,
            dequantization_rules,
            enum_rules,
        };
        registry.validate_consistency()?;
        Ok(registry)
    }

    /// Every aspect with both a raw and a clean schema must agree on which
    /// fields, after applying the raw schema's own transformation rules,
    /// a clean record produces. This is checked once at startup so that a
    /// buggy field rename surfaces immediately rather than mid-replay.
    fn validate_consistency(&self) -> Result<()> {
        for (aspect, raw) in &self.raw_by_aspect {
            let Some(clean) = self.clean_by_aspect.get(aspect) else {
                return Err(Error::ConfigInconsistent {
                    reason: format!("aspect '{aspect}' has a raw schema but no clean schema"),
                });
            };

            let mut expected: Vec<&'static str> = Vec::with_capacity(raw.fields.len());
            for field in raw.fields {
                let name = field
                    .metadata
                    .enum_map
                    .map(|(clean_field, _)| clean_field)
                    .unwrap_or(field.name);
                expected.push(name);
            }

            let actual: Vec<&'static str> = clean.fields.iter().map(|f| f.name).collect();
            if expected != actual {
                return Err(Error::ConfigInconsistent {
                    reason: format!(
                        "aspect '{aspect}' clean schema field order {actual:?} does not match \
                         raw schema's derived field order {expected:?}"
                    ),
                });
            }
        }

        for aspect in self.clean_by_aspect.keys() {
            if !self.raw_by_aspect.contains_key(aspect) {
                return Err(Error::ConfigInconsistent {
                    reason: format!("aspect '{aspect}' has a clean schema but no raw schema"),
                });
            }
        }

        Ok(())
    }

    /// The raw schema for `aspect`, if recognized.
    pub fn raw_schema_for(&self, aspect: &str) -> Option<&'static RawSchema> {
        self.raw_by_aspect.get(aspect).copied().or_else(|| raw_schema_for(aspect))
    }

    /// The clean schema for `aspect`, if recognized.
    pub fn clean_schema_for(&self, aspect: &str) -> Option<&'static CleanSchema> {
        self.clean_by_aspect
            .get(aspect)
            .copied()
            .or_else(|| clean_schema_for(aspect))
    }

    /// All aspect names this registry recognizes, in catalogue order.
    pub fn recognized_aspects(&self) -> Vec<&'static str> {
        super::raw::RAW_SCHEMAS.iter().map(|s| s.aspect).collect()
    }

    /// `true` if `aspect` has both a raw and clean schema registered.
    pub fn is_recognized(&self, aspect: &str) -> bool {
        self.raw_by_aspect.contains_key(aspect)
    }

    /// All dequantization rules, across all aspects.
    pub fn dequantization_rules(&self) -> &[DequantizationRule] {
        &self.dequantization_rules
    }

    /// All enum-interning rules, across all aspects.
    pub fn enum_rules(&self) -> &[EnumRule] {
        &self.enum_rules
    }

    /// The dequantization rules that apply to a single aspect.
    pub fn dequantization_rules_for(&self, aspect: &str) -> impl Iterator<Item = &DequantizationRule> + '_ {
        self.dequantization_rules.iter().filter(move |r| r.aspect == aspect)
    }

    /// The enum-interning rules that apply to a single aspect.
    pub fn enum_rules_for(&self, aspect: &str) -> impl Iterator<Item = &EnumRule> + '_ {
        self.enum_rules.iter().filter(move |r| r.aspect == aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error() {
        let registry = SchemaRegistry::build().expect("catalogue must be internally consistent");
        assert_eq!(registry.recognized_aspects().len(), 10);
    }

    #[test]
    fn team_stats_has_dequantization_rules() {
        let registry = SchemaRegistry::build().unwrap();
        let rules: Vec<_> = registry.dequantization_rules_for("team_stats").collect();
        assert!(!rules.is_empty());
        assert!(rules.iter().any(|r| r.raw_field == "metal_used" && r.divisor == 10.0));
    }

    #[test]
    fn commands_log_has_enum_rule() {
        let registry = SchemaRegistry::build().unwrap();
        let rules: Vec<_> = registry.enum_rules_for("commands_log").collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].enum_kind, "CommandsEnum");
        assert_eq!(rules[0].clean_field, "cmd_name");
    }

    #[test]
    fn unrecognized_aspect_is_reported() {
        let registry = SchemaRegistry::build().unwrap();
        assert!(!registry.is_recognized("not_a_real_aspect"));
        assert!(registry.raw_schema_for("not_a_real_aspect").is_none());
    }
}
