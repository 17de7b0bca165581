//! Clean aspect schemas: the post-transform field layout used to derive a
//! table's column dtypes (§4.4).

use super::EnumKindName;

/// The type of a clean-schema field, after dequantization/enum interning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanFieldType {
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit float (the result of dequantization, or a field that was
    /// already floating-point).
    Float,
    /// A UTF-8 string.
    Str,
    /// A boolean.
    Bool,
    /// A symbolic enum value, interned from an integer code.
    Enum(EnumKindName),
}

/// One field in a clean aspect schema.
#[derive(Debug, Clone, Copy)]
pub struct CleanFieldDescriptor {
    /// The field's name.
    pub name: &'static str,
    /// The field's clean type.
    pub field_type: CleanFieldType,
    /// `true` if the field may be null.
    pub optional: bool,
}

const fn field(name: &'static str, field_type: CleanFieldType) -> CleanFieldDescriptor {
    CleanFieldDescriptor {
        name,
        field_type,
        optional: false,
    }
}

const fn opt_field(name: &'static str, field_type: CleanFieldType) -> CleanFieldDescriptor {
    CleanFieldDescriptor {
        name,
        field_type,
        optional: true,
    }
}

/// The clean schema for a single aspect: its name and ordered field list.
/// Field order here is authoritative for the materialized table's column
/// order (§3, "Clean record").
#[derive(Debug, Clone, Copy)]
pub struct CleanSchema {
    /// The aspect name.
    pub aspect: &'static str,
    /// Ordered clean fields.
    pub fields: &'static [CleanFieldDescriptor],
}

const COMMANDS_LOG: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("teamId", CleanFieldType::Int),
    field("unitId", CleanFieldType::Int),
    opt_field("cmd_name", CleanFieldType::Enum("CommandsEnum")),
    field("cmd_tag", CleanFieldType::Int),
    opt_field("target_unit_id", CleanFieldType::Int),
    field("x", CleanFieldType::Int),
    field("y", CleanFieldType::Int),
    field("z", CleanFieldType::Int),
];

const CONSTRUCTION_LOG: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    opt_field("event", CleanFieldType::Enum("ConstructionActionsEnum")),
    field("builder_unit_id", CleanFieldType::Int),
    field("builder_unit_def_id", CleanFieldType::Int),
    field("builder_player_id", CleanFieldType::Int),
    field("target_unit_id", CleanFieldType::Int),
    field("target_unit_def_id", CleanFieldType::Int),
    opt_field("target_player_id", CleanFieldType::Int),
    field("buildpower", CleanFieldType::Float),
];

const TEAM_STATS: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("team_id", CleanFieldType::Int),
    field("metal_used", CleanFieldType::Float),
    field("metal_produced", CleanFieldType::Float),
    field("metal_excess", CleanFieldType::Float),
    field("metal_received", CleanFieldType::Float),
    field("metal_sent", CleanFieldType::Float),
    field("energy_used", CleanFieldType::Float),
    field("energy_produced", CleanFieldType::Float),
    field("energy_excess", CleanFieldType::Float),
    field("energy_received", CleanFieldType::Float),
    field("energy_sent", CleanFieldType::Float),
    field("damage_dealt", CleanFieldType::Float),
    field("damage_received", CleanFieldType::Float),
    field("units_killed", CleanFieldType::Int),
    field("units_died", CleanFieldType::Int),
    field("units_captured", CleanFieldType::Int),
    field("units_out_captured", CleanFieldType::Int),
    field("units_received", CleanFieldType::Int),
    field("units_sent", CleanFieldType::Int),
    field("max_units", CleanFieldType::Int),
    field("current_unit_count", CleanFieldType::Int),
    field("metal_current", CleanFieldType::Float),
    field("metal_storage", CleanFieldType::Float),
    field("metal_pull", CleanFieldType::Float),
    field("metal_income", CleanFieldType::Float),
    field("metal_expense", CleanFieldType::Float),
    field("metal_share", CleanFieldType::Float),
    field("metal_Rsent", CleanFieldType::Float),
    field("metal_Rreceived", CleanFieldType::Float),
    field("metal_Rexcess", CleanFieldType::Float),
    field("energy_current", CleanFieldType::Float),
    field("energy_storage", CleanFieldType::Float),
    field("energy_pull", CleanFieldType::Float),
    field("energy_income", CleanFieldType::Float),
    field("energy_expense", CleanFieldType::Float),
    field("energy_share", CleanFieldType::Float),
    field("energy_Rsent", CleanFieldType::Float),
    field("energy_Rreceived", CleanFieldType::Float),
    field("energy_Rexcess", CleanFieldType::Float),
];

const UNIT_ECONOMY: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("unit_id", CleanFieldType::Int),
    field("unit_def_id", CleanFieldType::Int),
    field("team_id", CleanFieldType::Int),
    opt_field("event_type", CleanFieldType::Enum("UnitEconomyEventsEnum")),
    field("metal_make", CleanFieldType::Float),
    field("metal_use", CleanFieldType::Float),
    field("energy_make", CleanFieldType::Float),
    field("energy_use", CleanFieldType::Float),
];

const UNIT_EVENTS: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("unit_id", CleanFieldType::Int),
    opt_field("unitDefID", CleanFieldType::Int),
    opt_field("unit_team_id", CleanFieldType::Int),
    field("x", CleanFieldType::Int),
    field("y", CleanFieldType::Int),
    opt_field("z", CleanFieldType::Int),
    opt_field("attacker_unit_id", CleanFieldType::Int),
    opt_field("attacker_unit_def_id", CleanFieldType::Int),
    opt_field("attacker_team_id", CleanFieldType::Int),
    opt_field("event_type", CleanFieldType::Enum("UnitEventsEnum")),
    opt_field("old_team_id", CleanFieldType::Int),
    opt_field("new_team_id", CleanFieldType::Int),
    opt_field("builder_id", CleanFieldType::Int),
    opt_field("factory_queue_len", CleanFieldType::Int),
];

const UNIT_POSITIONS: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("unit_id", CleanFieldType::Int),
    field("unit_def_id", CleanFieldType::Int),
    field("team_id", CleanFieldType::Int),
    field("x", CleanFieldType::Int),
    field("y", CleanFieldType::Int),
    field("z", CleanFieldType::Int),
    field("vx", CleanFieldType::Float),
    field("vy", CleanFieldType::Float),
    field("vz", CleanFieldType::Float),
    field("heading", CleanFieldType::Int),
];

const UNIT_STATE_SNAPSHOTS: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("unit_id", CleanFieldType::Int),
    field("team_id", CleanFieldType::Int),
    field("currentHealth", CleanFieldType::Int),
    field("currentMaxHealth", CleanFieldType::Int),
    field("experience", CleanFieldType::Float),
    field("is_being_built", CleanFieldType::Bool),
    field("is_stunned", CleanFieldType::Bool),
    field("is_cloaked", CleanFieldType::Bool),
    field("is_transporting_count", CleanFieldType::Int),
    field("current_max_range", CleanFieldType::Int),
    field("is_firing", CleanFieldType::Bool),
];

const DAMAGE_LOG: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("victim_team_id", CleanFieldType::Int),
    opt_field("attacker_team_id", CleanFieldType::Int),
    field("victim_unit_id", CleanFieldType::Int),
    field("victim_def_id", CleanFieldType::Int),
    opt_field("attacker_unit_id", CleanFieldType::Int),
    opt_field("attacker_def_id", CleanFieldType::Int),
    field("weapon_def_id", CleanFieldType::Int),
    field("projectile_id", CleanFieldType::Int),
    field("damage", CleanFieldType::Int),
    field("is_paralyzer", CleanFieldType::Bool),
    field("victim_pos_x", CleanFieldType::Int),
    field("victim_pos_y", CleanFieldType::Int),
    field("victim_pos_z", CleanFieldType::Int),
];

const MAP_ENVIR_ECON: &[CleanFieldDescriptor] = &[
    field("frame", CleanFieldType::Int),
    field("wind_strength", CleanFieldType::Int),
    field("tidal_strength", CleanFieldType::Int),
];

const START_POS: &[CleanFieldDescriptor] = &[
    field("player_id", CleanFieldType::Int),
    field("player_name", CleanFieldType::Str),
    field("commander_def_name", CleanFieldType::Str),
    field("unit_def_id", CleanFieldType::Int),
    field("x", CleanFieldType::Int),
    field("y", CleanFieldType::Int),
    field("z", CleanFieldType::Int),
];

/// All clean aspect schemas known at compile time, keyed the same way as
/// [`super::raw::RAW_SCHEMAS`].
pub const CLEAN_SCHEMAS: &[CleanSchema] = &[
    CleanSchema {
        aspect: "commands_log",
        fields: COMMANDS_LOG,
    },
    CleanSchema {
        aspect: "construction_log",
        fields: CONSTRUCTION_LOG,
    },
    CleanSchema {
        aspect: "team_stats",
        fields: TEAM_STATS,
    },
    CleanSchema {
        aspect: "unit_economy",
        fields: UNIT_ECONOMY,
    },
    CleanSchema {
        aspect: "unit_events",
        fields: UNIT_EVENTS,
    },
    CleanSchema {
        aspect: "unit_positions",
        fields: UNIT_POSITIONS,
    },
    CleanSchema {
        aspect: "unit_state_snapshots",
        fields: UNIT_STATE_SNAPSHOTS,
    },
    CleanSchema {
        aspect: "damage_log",
        fields: DAMAGE_LOG,
    },
    CleanSchema {
        aspect: "map_envir_econ",
        fields: MAP_ENVIR_ECON,
    },
    CleanSchema {
        aspect: "start_pos",
        fields: START_POS,
    },
];

/// Looks up the clean schema for `aspect`, if registered.
pub fn clean_schema_for(aspect: &str) -> Option<&'static CleanSchema> {
    CLEAN_SCHEMAS.iter().find(|s| s.aspect == aspect)
}
