//! RBAC domain types: roles, permissions, drafts, and list queries.

use chrono::{DateTime, Utc};
use kateglo_core::{PermissionId, RoleId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RbacError;

/// Largest page a list query may request.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Page size used when none (or zero, or garbage) is requested.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// A role row annotated for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub editorial_access: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Users assigned to this role.
    pub user_count: i64,
    pub permission_count: i64,
    /// Sorted permission codes.
    pub permission_codes: Vec<String>,
}

/// A single role with its permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDetail {
    pub id: RoleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub editorial_access: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Sorted permission ids.
    pub permission_ids: Vec<PermissionId>,
    /// Sorted permission codes.
    pub permission_codes: Vec<String>,
}

/// A permission row annotated for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    pub id: PermissionId,
    pub code: String,
    pub name: String,
    pub group_label: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub role_count: i64,
    /// Sorted role codes.
    pub role_codes: Vec<String>,
}

/// A single permission with the roles that hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDetail {
    pub id: PermissionId,
    pub code: String,
    pub name: String,
    pub group_label: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Sorted role ids.
    pub role_ids: Vec<RoleId>,
    /// Sorted role codes.
    pub role_codes: Vec<String>,
}

/// Lightweight role entry for pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleOption {
    pub id: RoleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// Lightweight permission entry for pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionOption {
    pub id: PermissionId,
    pub code: String,
    pub name: String,
    pub group_label: Option<String>,
}

/// One page of a list query plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

/// Clamped paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Clamps raw values: limit to `[1, MAX_PAGE_SIZE]` with zero or absent
    /// meaning the default, offset to `>= 0`.
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(limit) => limit.clamp(1, MAX_PAGE_SIZE),
        };
        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Clamps raw query-string values; non-numeric input counts as absent.
    #[must_use]
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Self {
        Self::new(limit.and_then(parse_integer), offset.and_then(parse_integer))
    }
}

/// Search text and paging for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive partial match; `None` lists everything.
    pub search: Option<String>,
    pub page: Pagination,
}

impl ListQuery {
    /// Builds a query from raw query-string values.
    #[must_use]
    pub fn parse(search: Option<&str>, limit: Option<&str>, offset: Option<&str>) -> Self {
        Self {
            search: normalize_search(search),
            page: Pagination::parse(limit, offset),
        }
    }
}

/// Trims a search term; blank terms disable filtering.
#[must_use]
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// A deduplicated set of related entity ids in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedIds(Vec<i32>);

impl RelatedIds {
    /// Lenient normalization of untrusted input.
    ///
    /// Non-arrays become the empty set. Numbers and numeric strings are
    /// coerced to integers; anything that is not a positive integer is
    /// dropped.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Array(items) = value else {
            return Self::default();
        };
        Self::collect(items.iter().filter_map(positive_id))
    }

    /// Strict validation of request input.
    ///
    /// An absent field is the empty set. Returns `None` when the value is not
    /// an array or any element is not a positive integer.
    #[must_use]
    pub fn from_strict_value(value: Option<&Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => Some(Self::default()),
            Some(Value::Array(items)) => items
                .iter()
                .map(positive_id)
                .collect::<Option<Vec<_>>>()
                .map(|ids| Self::collect(ids.into_iter())),
            Some(_) => None,
        }
    }

    fn collect(ids: impl Iterator<Item = i32>) -> Self {
        let mut seen = Vec::new();
        for id in ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        Self(seen)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<const N: usize> From<[i32; N]> for RelatedIds {
    fn from(ids: [i32; N]) -> Self {
        Self::from_value(&Value::from(ids.to_vec()))
    }
}

fn positive_id(value: &Value) -> Option<i32> {
    let id = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => parse_integer(s),
        _ => None,
    }?;
    i32::try_from(id).ok().filter(|id| *id > 0)
}

fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Validated input for creating or updating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    /// Target row; `None` creates a new role.
    pub id: Option<RoleId>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub editorial_access: bool,
    /// Exact permission set after the save.
    pub permission_ids: RelatedIds,
}

/// Validated input for creating or updating a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDraft {
    /// Target row; `None` creates a new permission.
    pub id: Option<PermissionId>,
    pub code: String,
    pub name: String,
    pub group_label: Option<String>,
    /// Exact role set after the save.
    pub role_ids: RelatedIds,
}

/// Raw role request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub editorial_access: Option<Value>,
    #[serde(default)]
    pub permission_ids: Option<Value>,
}

impl RoleInput {
    /// Validates the body into a draft targeting `id`.
    pub fn into_draft(self, id: Option<RoleId>) -> Result<RoleDraft, RbacError> {
        let code = required_text(self.code, "role", "code")?;
        let name = required_text(self.name, "role", "name")?;
        let permission_ids = RelatedIds::from_strict_value(self.permission_ids.as_ref()).ok_or(
            RbacError::InvalidRelatedIds {
                field: "permission_ids",
            },
        )?;
        Ok(RoleDraft {
            id,
            code,
            name,
            description: optional_text(self.description),
            editorial_access: self.editorial_access.as_ref().is_some_and(parse_flag),
            permission_ids,
        })
    }
}

/// Raw permission request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub role_ids: Option<Value>,
}

impl PermissionInput {
    /// Validates the body into a draft targeting `id`.
    pub fn into_draft(self, id: Option<PermissionId>) -> Result<PermissionDraft, RbacError> {
        let code = required_text(self.code, "permission", "code")?;
        let name = required_text(self.name, "permission", "name")?;
        let role_ids = RelatedIds::from_strict_value(self.role_ids.as_ref())
            .ok_or(RbacError::InvalidRelatedIds { field: "role_ids" })?;
        Ok(PermissionDraft {
            id,
            code,
            name,
            group_label: optional_text(self.group_label),
            role_ids,
        })
    }
}

fn required_text(
    value: Option<String>,
    entity: &'static str,
    field: &'static str,
) -> Result<String, RbacError> {
    optional_text(value).ok_or(RbacError::MissingField { entity, field })
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a checkbox-style flag sent as a bool, number, or string.
fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "ya" | "aktif"
        ),
        _ => false,
    }
}
