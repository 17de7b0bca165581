//! The enum kind registry: bidirectional name/code maps for the symbolic
//! values that appear in telemetry, looked up by string key rather than by
//! Rust type so that schema field metadata and output contracts can
//! reference a kind without depending on its concrete definition (§3,
//! "Enum kind").

/// One member of an enum kind: its symbolic name and integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumMember {
    /// The symbolic name, e.g. `"ATTACK"`.
    pub name: &'static str,
    /// The integer code it is interned from/to.
    pub code: i64,
}

const fn member(name: &'static str, code: i64) -> EnumMember {
    EnumMember { name, code }
}

/// A closed, registered enum kind: an ordered list of members.
#[derive(Debug, Clone, Copy)]
pub struct EnumKind {
    /// The kind's name, as referenced from schema field metadata.
    pub name: &'static str,
    /// The kind's members.
    pub members: &'static [EnumMember],
}

impl EnumKind {
    /// Looks up the symbolic name for an integer code, if it names a member.
    pub fn name_for(&self, code: i64) -> Option<&'static str> {
        self.members.iter().find(|m| m.code == code).map(|m| m.name)
    }

    /// Looks up the integer code for a symbolic name, if it names a member.
    pub fn code_for(&self, name: &str) -> Option<i64> {
        self.members.iter().find(|m| m.name == name).map(|m| m.code)
    }
}

const COMMANDS_ENUM: EnumKind = EnumKind {
    name: "CommandsEnum",
    members: &[
        member("BUILD", 1),
        member("ATTACK", 2),
        member("CAPTURE", 3),
        member("FIGHT", 4),
        member("GUARD", 5),
        member("LOAD_UNITS", 6),
        member("MANUAL_FIRE", 7),
        member("MOVE", 8),
        member("PATROL", 9),
        member("RECLAIM", 10),
        member("REPAIR", 11),
        member("RESURRECT", 12),
        member("STOP", 13),
        member("UNLOAD_UNITS", 14),
        member("WAIT", 15),
    ],
};

const CONSTRUCTION_ACTIONS_ENUM: EnumKind = EnumKind {
    name: "ConstructionActionsEnum",
    members: &[
        member("CONSTRUCTION_START", 1),
        member("CONSTRUCTION_SNAPSHOT", 2),
        member("CONSTRUCTION_END", 3),
        member("ASSIST_START", 4),
        member("ASSIST_SNAPSHOT", 5),
        member("ASSIST_END", 6),
    ],
};

const UNIT_ECONOMY_EVENTS_ENUM: EnumKind = EnumKind {
    name: "UnitEconomyEventsEnum",
    members: &[
        member("PRODUCTION_STARTED", 1),
        member("SNAPSHOT", 2),
        member("DESTROYED", 3),
    ],
};

const UNIT_EVENTS_ENUM: EnumKind = EnumKind {
    name: "UnitEventsEnum",
    members: &[
        member("CREATED", 1),
        member("FINISHED", 2),
        member("DESTROYED", 3),
        member("GIVEN", 4),
        member("TAKEN", 5),
    ],
};

/// Every enum kind known at compile time. Add further kinds here as the
/// aspect catalogue grows; nothing outside this module needs to change.
pub const ENUM_REGISTRY: &[EnumKind] = &[
    COMMANDS_ENUM,
    CONSTRUCTION_ACTIONS_ENUM,
    UNIT_ECONOMY_EVENTS_ENUM,
    UNIT_EVENTS_ENUM,
];

/// Looks up a registered enum kind by name.
pub fn enum_kind(name: &str) -> Option<&'static EnumKind> {
    ENUM_REGISTRY.iter().find(|k| k.name == name)
}

/// Interns an integer code against a registered enum kind, returning its
/// symbolic name. Returns `None` both when the kind itself is unregistered
/// and when the code names no member of a registered kind; callers
/// distinguish the two only for logging, since both are treated as
/// "unknown enum value, emit null" per the transformer's contract (§4.3).
pub fn intern(kind_name: &str, code: i64) -> Option<&'static str> {
    enum_kind(kind_name).and_then(|k| k.name_for(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_known_code() {
        assert_eq!(intern("CommandsEnum", 2), Some("ATTACK"));
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(intern("CommandsEnum", 999), None);
    }

    #[test]
    fn unregistered_kind_is_none() {
        assert_eq!(intern("NotAKind", 1), None);
    }

    #[test]
    fn every_kind_round_trips_names_to_codes() {
        for kind in ENUM_REGISTRY {
            for m in kind.members {
                assert_eq!(kind.code_for(m.name), Some(m.code));
                assert_eq!(kind.name_for(m.code), Some(m.name));
            }
        }
    }
}
