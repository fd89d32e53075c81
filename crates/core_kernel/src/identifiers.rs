//! Strongly-typed identifiers for domain entities
//!
//! Using newtype wrappers around UUIDs provides type safety and prevents
//! accidental mixing of different identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Master-data identifiers (owned by external admin systems)
define_id!(BranchId, "BRN");
define_id!(CurrencyId, "CCY");
define_id!(OperatorId, "OPR");

// Exchange domain identifiers
define_id!(TransactionId, "TXN");
define_id!(GroupId, "GRP");
define_id!(AdjustmentId, "ADJ");

// Compliance domain identifiers
define_id!(RuleId, "RUL");
define_id!(ReservationId, "RSV");
define_id!(AmloReportId, "AML");
define_id!(BotEventId, "BOT");
define_id!(SequenceRowId, "SEQ");
define_id!(FieldDefId, "FLD");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_id_display() {
        let id = BranchId::new();
        assert!(id.to_string().starts_with("BRN-"));
    }

    #[test]
    fn test_id_parsing() {
        let original = ReservationId::new();
        let parsed: ReservationId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let txn_id = TransactionId::from(uuid);
        let back: Uuid = txn_id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        // Ordering is only defined across millisecond boundaries
        let a = TransactionId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = TransactionId::new_v7();
        assert!(a.as_uuid() < b.as_uuid());
    }
}
