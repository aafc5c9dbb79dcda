//! RBAC input validation errors.
//!
//! Storage failures are not wrapped here: the store hands back its
//! backend's own error type unchanged.

use std::fmt;

/// Rejections of role or permission input before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// A required text field is missing or blank.
    MissingField {
        /// Entity being saved ("role" or "permission").
        entity: &'static str,
        /// Field name.
        field: &'static str,
    },
    /// Related ids were not an array of positive integers.
    InvalidRelatedIds {
        /// Field name.
        field: &'static str,
    },
}

impl fmt::Display for RbacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "{entity} {field} is required")
            }
            Self::InvalidRelatedIds { field } => {
                write!(f, "{field} must be an array of positive integers")
            }
        }
    }
}

impl std::error::Error for RbacError {}
