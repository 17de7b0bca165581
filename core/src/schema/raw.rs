//! Raw aspect schemas: the positional field layout a replay's `.mpk` files
//! are decoded against, before dequantization or enum interning.

/// The scalar type a raw positional value is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// A signed 64-bit integer as decoded from the self-describing format.
    Int,
    /// A floating-point number.
    Float,
    /// A UTF-8 string.
    Str,
    /// A boolean.
    Bool,
}

/// Per-field transformation rules, folded by [`super::registry::SchemaRegistry`]
/// into the derived dequantization and enum maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMetadata {
    /// If set, the raw integer value is divided by this divisor to produce
    /// a clean 64-bit float. Only meaningful for [`ScalarType::Int`] fields.
    pub dequantize_by: Option<f64>,
    /// If set, the raw integer code names a member of the given enum kind;
    /// the clean record carries the symbolic name under `clean_field` instead
    /// of the raw field's own name.
    pub enum_map: Option<(&'static str, super::EnumKindName)>,
}

impl FieldMetadata {
    /// No transformation: the field passes through unchanged.
    pub const NONE: Self = Self {
        dequantize_by: None,
        enum_map: None,
    };

    /// A dequantization rule with the given divisor.
    pub const fn dequantize(divisor: f64) -> Self {
        Self {
            dequantize_by: Some(divisor),
            enum_map: None,
        }
    }

    /// An enum-interning rule naming the clean field and enum kind.
    pub const fn enum_map(clean_field: &'static str, enum_kind: super::EnumKindName) -> Self {
        Self {
            dequantize_by: None,
            enum_map: Some((clean_field, enum_kind)),
        }
    }
}

/// One positional field in a raw aspect schema.
#[derive(Debug, Clone, Copy)]
pub struct RawFieldDescriptor {
    /// The field's name, also its position-independent key in a raw record.
    pub name: &'static str,
    /// The scalar type positional decoding validates this field against.
    pub scalar_type: ScalarType,
    /// `true` if this field may be absent (decoded as null / right-padded).
    pub optional: bool,
    /// Transformation metadata for this field.
    pub metadata: FieldMetadata,
}

impl RawFieldDescriptor {
    const fn required(name: &'static str, scalar_type: ScalarType) -> Self {
        Self {
            name,
            scalar_type,
            optional: false,
            metadata: FieldMetadata::NONE,
        }
    }

    const fn opt(name: &'static str, scalar_type: ScalarType) -> Self {
        Self {
            name,
            scalar_type,
            optional: true,
            metadata: FieldMetadata::NONE,
        }
    }

    const fn with_metadata(mut self, metadata: FieldMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

const fn int(name: &'static str) -> RawFieldDescriptor {
    RawFieldDescriptor::required(name, ScalarType::Int)
}

const fn opt_int(name: &'static str) -> RawFieldDescriptor {
    RawFieldDescriptor::opt(name, ScalarType::Int)
}

const fn string(name: &'static str) -> RawFieldDescriptor {
    RawFieldDescriptor::required(name, ScalarType::Str)
}

const fn boolean(name: &'static str) -> RawFieldDescriptor {
    RawFieldDescriptor::required(name, ScalarType::Bool)
}

/// The raw schema for a single aspect: its name and ordered field list.
#[derive(Debug, Clone, Copy)]
pub struct RawSchema {
    /// The aspect name, e.g. `"team_stats"`.
    pub aspect: &'static str,
    /// Ordered positional fields. Position in this slice is the position in
    /// the decoded record's tuple.
    pub fields: &'static [RawFieldDescriptor],
}

impl RawSchema {
    /// The number of positional fields (the record's expected arity).
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

macro_rules! dequant {
    ($name:expr, $divisor:expr) => {
        int($name).with_metadata(FieldMetadata::dequantize($divisor))
    };
}

macro_rules! enum_field {
    ($raw_name:expr, $clean_name:expr, $enum_kind:expr) => {
        int($raw_name).with_metadata(FieldMetadata::enum_map($clean_name, $enum_kind))
    };
}

const COMMANDS_LOG_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("teamId"),
    int("unitId"),
    enum_field!("cmd_id", "cmd_name", "CommandsEnum"),
    int("cmd_tag"),
    opt_int("target_unit_id"),
    int("x"),
    int("y"),
    int("z"),
];

const CONSTRUCTION_LOG_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    enum_field!("event", "event", "ConstructionActionsEnum"),
    int("builder_unit_id"),
    int("builder_unit_def_id"),
    int("builder_player_id"),
    int("target_unit_id"),
    int("target_unit_def_id"),
    opt_int("target_player_id"),
    dequant!("buildpower", 1000.0),
];

const TEAM_STATS_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("team_id"),
    dequant!("metal_used", 10.0),
    dequant!("metal_produced", 10.0),
    dequant!("metal_excess", 10.0),
    dequant!("metal_received", 10.0),
    dequant!("metal_sent", 10.0),
    dequant!("energy_used", 10.0),
    dequant!("energy_produced", 10.0),
    dequant!("energy_excess", 10.0),
    dequant!("energy_received", 10.0),
    dequant!("energy_sent", 10.0),
    dequant!("damage_dealt", 10.0),
    dequant!("damage_received", 10.0),
    int("units_killed"),
    int("units_died"),
    int("units_captured"),
    int("units_out_captured"),
    int("units_received"),
    int("units_sent"),
    int("max_units"),
    int("current_unit_count"),
    dequant!("metal_current", 10.0),
    dequant!("metal_storage", 10.0),
    dequant!("metal_pull", 10.0),
    dequant!("metal_income", 10.0),
    dequant!("metal_expense", 10.0),
    dequant!("metal_share", 10.0),
    dequant!("metal_Rsent", 10.0),
    dequant!("metal_Rreceived", 10.0),
    dequant!("metal_Rexcess", 10.0),
    dequant!("energy_current", 10.0),
    dequant!("energy_storage", 10.0),
    dequant!("energy_pull", 10.0),
    dequant!("energy_income", 10.0),
    dequant!("energy_expense", 10.0),
    dequant!("energy_share", 10.0),
    dequant!("energy_Rsent", 10.0),
    dequant!("energy_Rreceived", 10.0),
    dequant!("energy_Rexcess", 10.0),
];

const UNIT_ECONOMY_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("unit_id"),
    int("unit_def_id"),
    int("team_id"),
    enum_field!("event_type", "event_type", "UnitEconomyEventsEnum"),
    dequant!("metal_make", 10.0),
    dequant!("metal_use", 10.0),
    dequant!("energy_make", 10.0),
    dequant!("energy_use", 10.0),
];

const UNIT_EVENTS_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("unit_id"),
    opt_int("unitDefID"),
    int("unit_team_id"),
    int("x"),
    int("y"),
    opt_int("z"),
    opt_int("attacker_unit_id"),
    opt_int("attacker_unit_def_id"),
    opt_int("attacker_team_id"),
    enum_field!("event_type", "event_type", "UnitEventsEnum"),
    opt_int("old_team_id"),
    opt_int("new_team_id"),
    opt_int("builder_id"),
    opt_int("factory_queue_len"),
];

const UNIT_POSITIONS_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("unit_id"),
    int("unit_def_id"),
    int("team_id"),
    int("x"),
    int("y"),
    int("z"),
    dequant!("vx", 1000.0),
    dequant!("vy", 1000.0),
    dequant!("vz", 1000.0),
    int("heading"),
];

const UNIT_STATE_SNAPSHOTS_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("unit_id"),
    int("team_id"),
    int("currentHealth"),
    int("currentMaxHealth"),
    dequant!("experience", 1000.0),
    boolean("is_being_built"),
    boolean("is_stunned"),
    boolean("is_cloaked"),
    int("is_transporting_count"),
    int("current_max_range"),
    boolean("is_firing"),
];

const DAMAGE_LOG_FIELDS: &[RawFieldDescriptor] = &[
    int("frame"),
    int("victim_team_id"),
    opt_int("attacker_team_id"),
    int("victim_unit_id"),
    int("victim_def_id"),
    opt_int("attacker_unit_id"),
    opt_int("attacker_def_id"),
    int("weapon_def_id"),
    int("projectile_id"),
    int("damage"),
    boolean("is_paralyzer"),
    int("victim_pos_x"),
    int("victim_pos_y"),
    int("victim_pos_z"),
];

const MAP_ENVIR_ECON_FIELDS: &[RawFieldDescriptor] =
    &[int("frame"), int("wind_strength"), int("tidal_strength")];

const START_POS_FIELDS: &[RawFieldDescriptor] = &[
    int("player_id"),
    string("player_name"),
    string("commander_def_name"),
    int("unit_def_id"),
    int("x"),
    int("y"),
    int("z"),
];

/// All raw aspect schemas known at compile time. This is the single source
/// [`super::registry::SchemaRegistry`] introspects to build the derived
/// dequantization and enum maps.
pub const RAW_SCHEMAS: &[RawSchema] = &[
    RawSchema {
        aspect: "commands_log",
        fields: COMMANDS_LOG_FIELDS,
    },
    RawSchema {
        aspect: "construction_log",
        fields: CONSTRUCTION_LOG_FIELDS,
    },
    RawSchema {
        aspect: "team_stats",
        fields: TEAM_STATS_FIELDS,
    },
    RawSchema {
        aspect: "unit_economy",
        fields: UNIT_ECONOMY_FIELDS,
    },
    RawSchema {
        aspect: "unit_events",
        fields: UNIT_EVENTS_FIELDS,
    },
    RawSchema {
        aspect: "unit_positions",
        fields: UNIT_POSITIONS_FIELDS,
    },
    RawSchema {
        aspect: "unit_state_snapshots",
        fields: UNIT_STATE_SNAPSHOTS_FIELDS,
    },
    RawSchema {
        aspect: "damage_log",
        fields: DAMAGE_LOG_FIELDS,
    },
    RawSchema {
        aspect: "map_envir_econ",
        fields: MAP_ENVIR_ECON_FIELDS,
    },
    RawSchema {
        aspect: "start_pos",
        fields: START_POS_FIELDS,
    },
];

/// Looks up the raw schema for `aspect`, if registered.
pub fn raw_schema_for(aspect: &str) -> Option<&'static RawSchema> {
    RAW_SCHEMAS.iter().find(|s| s.aspect == aspect)
}
