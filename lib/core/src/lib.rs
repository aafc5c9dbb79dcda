//! Core domain types and utilities for the Kateglo identity services.
//!
//! This crate provides the identifier types and error handling foundation
//! shared by the platform-access, RBAC, and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, PermissionId, RoleId, UserId};
