//! Strongly typed record identifiers.
//!
//! Records live in an arena ([`crate::world::World`]) and reference each
//! other by these ids instead of by pointer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generates a `u64` newtype identifier with the standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the raw numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a match.
    MatchId
);
define_id!(
    /// Identifier of a participant seat within a match.
    ParticipantId
);
define_id!(
    /// Identifier of a turn record.
    TurnId
);
define_id!(
    /// Identifier of a unit.
    UnitId
);
define_id!(
    /// Identifier of a unit type.
    UnitTypeId
);
define_id!(
    /// Identifier of a kingdom.
    KingdomId
);
define_id!(
    /// Identifier of a land.
    LandId
);
define_id!(
    /// Identifier of a province.
    ProvinceId
);
define_id!(
    /// Identifier of a town.
    TownId
);
