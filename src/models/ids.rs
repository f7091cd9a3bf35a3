//! Strongly-typed ID wrappers
//!
//! Ids display in a short prefixed form ("txn-1a2b3c4d") that listings show
//! and commands accept back. Full UUIDs, with or without the prefix, parse
//! to the exact id; short forms are resolved against the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FintraxError;

/// Hex digits of the UUID shown in the short form
pub const SHORT_ID_LEN: usize = 8;

macro_rules! define_id {
    ($name:ident, $prefix:literal, $entity:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Whether a short id typed by a user ("txn-1a2b", "1a2b") names this id
            pub fn matches_short(&self, identifier: &str) -> bool {
                let needle = identifier.trim();
                let needle = needle.strip_prefix($prefix).unwrap_or(needle).to_lowercase();
                !needle.is_empty() && self.0.to_string().starts_with(&needle)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, &self.0.simple().to_string()[..SHORT_ID_LEN])
            }
        }

        impl FromStr for $name {
            type Err = FintraxError;

            /// Parse a full UUID, optionally prefixed
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let raw = trimmed.strip_prefix($prefix).unwrap_or(trimmed);
                Uuid::parse_str(raw).map(Self).map_err(|_| {
                    FintraxError::Validation(format!("'{}' is not a full {} id", s, $entity))
                })
            }
        }
    };
}

define_id!(TransactionId, "txn-", "transaction");
define_id!(MonthlyExpenseId, "rec-", "monthly expense");
define_id!(SnapshotId, "snap-", "snapshot");

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_id_display_is_short() {
        let id: TransactionId = UUID.parse().unwrap();
        assert_eq!(id.to_string(), "txn-550e8400");
        assert!(SnapshotId::new().to_string().starts_with("snap-"));
    }

    #[test]
    fn test_id_parse_with_and_without_prefix() {
        let plain: TransactionId = UUID.parse().unwrap();
        let prefixed: TransactionId = format!("txn-{}", UUID).parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.as_uuid().to_string(), UUID);
    }

    #[test]
    fn test_short_form_is_not_a_full_id() {
        let err = "txn-550e8400".parse::<TransactionId>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_matches_short() {
        let id: MonthlyExpenseId = UUID.parse().unwrap();
        assert!(id.matches_short("rec-550e"));
        assert!(id.matches_short("550E8400"));
        assert!(!id.matches_short("rec-"));
        assert!(!id.matches_short("txn-550e"));
        assert!(!id.matches_short("1234"));
    }

    #[test]
    fn test_id_serialization() {
        let id = MonthlyExpenseId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let deserialized: MonthlyExpenseId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
