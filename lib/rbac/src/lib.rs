//! Role-based access control administration for Kateglo.
//!
//! Roles own a set of permissions through a join relation. Every save
//! replaces that set wholesale inside one transaction, so the relation always
//! equals exactly what the last successful save submitted.
//!
//! Storage is abstracted behind [`RbacBackend`]; the server provides the
//! Postgres implementation.

pub mod error;
pub mod store;
pub mod transaction;
pub mod types;

pub use error::RbacError;
pub use store::{RbacBackend, RbacStore, RelationWriter};
pub use transaction::{Transaction, in_transaction};
pub use types::{
    ListQuery, Page, Pagination, PermissionDetail, PermissionDraft, PermissionInput,
    PermissionOption, PermissionSummary, RelatedIds, RoleDetail, RoleDraft, RoleInput,
    RoleOption, RoleSummary, normalize_search,
};
