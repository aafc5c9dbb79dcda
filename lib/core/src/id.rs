//! Strongly-typed ID types for identity entities.
//!
//! Users, roles, and permissions are keyed by Postgres `SERIAL` columns, so
//! every ID wraps a positive `i32`. Zero and negative values never name a
//! stored row and are rejected at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around a serial key.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub struct $name(i32);

        impl $name {
            /// Creates an ID from a raw key, rejecting non-positive values.
            #[must_use]
            pub const fn new(raw: i32) -> Option<Self> {
                if raw > 0 { Some(Self(raw)) } else { None }
            }

            /// Returns the raw database key.
            #[must_use]
            pub const fn get(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim().parse::<i32>().map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    reason: e.to_string(),
                })?;

                Self::try_from(raw)
            }
        }

        impl TryFrom<i32> for $name {
            type Error = ParseIdError;

            fn try_from(raw: i32) -> Result<Self, Self::Error> {
                Self::new(raw).ok_or_else(|| ParseIdError {
                    id_type: stringify!($name),
                    reason: format!("{raw} is not a positive key"),
                })
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user.
    UserId
);

define_id!(
    /// Unique identifier for a role.
    RoleId
);

define_id!(
    /// Unique identifier for a permission.
    PermissionId
);
