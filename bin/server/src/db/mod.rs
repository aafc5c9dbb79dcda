//! Database repositories for the Kateglo identity services.
//!
//! This module provides data access for:
//! - Users, consulted during login
//! - Roles, permissions, and their relation

pub mod rbac;
pub mod user;

pub use rbac::{PgRbacBackend, PgRelationTx};
pub use user::PgUserDirectory;

/// Converts a serial column into a typed key, failing the row on a
/// non-positive value.
fn decode_key<T>(
    raw: i32,
    make: fn(i32) -> Option<T>,
    what: &'static str,
) -> Result<T, sqlx::Error> {
    make(raw).ok_or_else(|| {
        sqlx::Error::Decode(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid {what} id '{raw}'"),
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kateglo_core::RoleId;

    #[test]
    fn decode_key_rejects_non_positive_ids() {
        assert_eq!(
            decode_key(7, RoleId::new, "role").expect("valid"),
            RoleId::new(7).expect("valid")
        );
        let err = decode_key(0, RoleId::new, "role").expect_err("zero");
        assert!(err.to_string().contains("invalid role id '0'"));
    }
}
