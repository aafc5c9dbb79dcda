//! Postgres storage for roles, permissions, and the role-permission relation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kateglo_core::{PermissionId, RoleId};
use kateglo_rbac::{
    ListQuery, Page, PermissionDetail, PermissionDraft, PermissionOption, PermissionSummary,
    RbacBackend, RelationWriter, RoleDetail, RoleDraft, RoleOption, RoleSummary, Transaction,
};
use sqlx::{FromRow, PgPool, Postgres};

use super::decode_key;

const ROLE_SEARCH: &str = "($1::text IS NULL OR r.code ILIKE $1 OR r.name ILIKE $1 \
     OR COALESCE(r.description, '') ILIKE $1)";

const PERMISSION_SEARCH: &str = "($1::text IS NULL OR p.code ILIKE $1 OR p.name ILIKE $1 \
     OR COALESCE(p.group_label, '') ILIKE $1)";

fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(|s| format!("%{s}%"))
}

#[derive(FromRow)]
struct RoleSummaryRow {
    id: i32,
    code: String,
    name: String,
    description: Option<String>,
    editorial_access: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    user_count: i64,
    permission_count: i64,
    permission_codes: Vec<String>,
}

impl RoleSummaryRow {
    fn try_into_summary(self) -> Result<RoleSummary, sqlx::Error> {
        Ok(RoleSummary {
            id: decode_key(self.id, RoleId::new, "role")?,
            code: self.code,
            name: self.name,
            description: self.description,
            editorial_access: self.editorial_access,
            created_at: self.created_at,
            updated_at: self.updated_at,
            user_count: self.user_count,
            permission_count: self.permission_count,
            permission_codes: self.permission_codes,
        })
    }
}

#[derive(FromRow)]
struct RoleDetailRow {
    id: i32,
    code: String,
    name: String,
    description: Option<String>,
    editorial_access: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    permission_ids: Vec<i32>,
    permission_codes: Vec<String>,
}

impl RoleDetailRow {
    fn try_into_detail(self) -> Result<RoleDetail, sqlx::Error> {
        Ok(RoleDetail {
            id: decode_key(self.id, RoleId::new, "role")?,
            code: self.code,
            name: self.name,
            description: self.description,
            editorial_access: self.editorial_access,
            created_at: self.created_at,
            updated_at: self.updated_at,
            permission_ids: self
                .permission_ids
                .into_iter()
                .map(|id| decode_key(id, PermissionId::new, "permission"))
                .collect::<Result<_, _>>()?,
            permission_codes: self.permission_codes,
        })
    }
}

#[derive(FromRow)]
struct PermissionSummaryRow {
    id: i32,
    code: String,
    name: String,
    group_label: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    role_count: i64,
    role_codes: Vec<String>,
}

impl PermissionSummaryRow {
    fn try_into_summary(self) -> Result<PermissionSummary, sqlx::Error> {
        Ok(PermissionSummary {
            id: decode_key(self.id, PermissionId::new, "permission")?,
            code: self.code,
            name: self.name,
            group_label: self.group_label,
            created_at: self.created_at,
            updated_at: self.updated_at,
            role_count: self.role_count,
            role_codes: self.role_codes,
        })
    }
}

#[derive(FromRow)]
struct PermissionDetailRow {
    id: i32,
    code: String,
    name: String,
    group_label: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    role_ids: Vec<i32>,
    role_codes: Vec<String>,
}

impl PermissionDetailRow {
    fn try_into_detail(self) -> Result<PermissionDetail, sqlx::Error> {
        Ok(PermissionDetail {
            id: decode_key(self.id, PermissionId::new, "permission")?,
            code: self.code,
            name: self.name,
            group_label: self.group_label,
            created_at: self.created_at,
            updated_at: self.updated_at,
            role_ids: self
                .role_ids
                .into_iter()
                .map(|id| decode_key(id, RoleId::new, "role"))
                .collect::<Result<_, _>>()?,
            role_codes: self.role_codes,
        })
    }
}

#[derive(FromRow)]
struct RoleOptionRow {
    id: i32,
    code: String,
    name: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct PermissionOptionRow {
    id: i32,
    code: String,
    name: String,
    group_label: Option<String>,
}

/// Role and permission storage on a Postgres pool.
#[derive(Clone)]
pub struct PgRbacBackend {
    pool: PgPool,
}

impl PgRbacBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// An upsert transaction holding one pooled connection until it ends.
pub struct PgRelationTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgRelationTx {
    type Error = sqlx::Error;

    async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

#[async_trait]
impl RelationWriter for PgRelationTx {
    async fn save_role(&mut self, draft: &RoleDraft) -> Result<Option<RoleId>, sqlx::Error> {
        let id: Option<i32> = match draft.id {
            Some(id) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE roles
                    SET code = $1, name = $2, description = NULLIF($3, ''),
                        editorial_access = $4, updated_at = NOW()
                    WHERE id = $5
                    RETURNING id
                    "#,
                )
                .bind(&draft.code)
                .bind(&draft.name)
                .bind(draft.description.as_deref())
                .bind(draft.editorial_access)
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?
            }
            None => Some(
                sqlx::query_scalar(
                    r#"
                    INSERT INTO roles (code, name, description, editorial_access)
                    VALUES ($1, $2, NULLIF($3, ''), $4)
                    RETURNING id
                    "#,
                )
                .bind(&draft.code)
                .bind(&draft.name)
                .bind(draft.description.as_deref())
                .bind(draft.editorial_access)
                .fetch_one(&mut *self.tx)
                .await?,
            ),
        };

        id.map(|id| decode_key(id, RoleId::new, "role")).transpose()
    }

    async fn clear_role_permissions(&mut self, role: RoleId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_role_permissions(
        &mut self,
        role: RoleId,
        permissions: &[i32],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role.get())
        .bind(permissions)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_permission(
        &mut self,
        draft: &PermissionDraft,
    ) -> Result<Option<PermissionId>, sqlx::Error> {
        let id: Option<i32> = match draft.id {
            Some(id) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE permissions
                    SET code = $1, name = $2, group_label = NULLIF($3, ''), updated_at = NOW()
                    WHERE id = $4
                    RETURNING id
                    "#,
                )
                .bind(&draft.code)
                .bind(&draft.name)
                .bind(draft.group_label.as_deref())
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?
            }
            None => Some(
                sqlx::query_scalar(
                    r#"
                    INSERT INTO permissions (code, name, group_label)
                    VALUES ($1, $2, NULLIF($3, ''))
                    RETURNING id
                    "#,
                )
                .bind(&draft.code)
                .bind(&draft.name)
                .bind(draft.group_label.as_deref())
                .fetch_one(&mut *self.tx)
                .await?,
            ),
        };

        id.map(|id| decode_key(id, PermissionId::new, "permission"))
            .transpose()
    }

    async fn clear_permission_roles(&mut self, permission: PermissionId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM role_permissions WHERE permission_id = $1")
            .bind(permission.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_permission_roles(
        &mut self,
        permission: PermissionId,
        roles: &[i32],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT UNNEST($2::int[]), $1
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(permission.get())
        .bind(roles)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RbacBackend for PgRbacBackend {
    type Error = sqlx::Error;
    type Tx = PgRelationTx;

    async fn begin(&self) -> Result<PgRelationTx, sqlx::Error> {
        Ok(PgRelationTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn list_roles(&self, query: &ListQuery) -> Result<Page<RoleSummary>, sqlx::Error> {
        let pattern = like_pattern(query.search.as_deref());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM roles r WHERE {ROLE_SEARCH}"
        ))
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<RoleSummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT
                r.id, r.code, r.name, r.description, r.editorial_access,
                r.created_at, r.updated_at,
                (SELECT COUNT(*) FROM users u WHERE u.role_id = r.id) AS user_count,
                (SELECT COUNT(*) FROM role_permissions rp WHERE rp.role_id = r.id)
                    AS permission_count,
                COALESCE(
                    (SELECT array_agg(p.code ORDER BY p.code)
                     FROM role_permissions rp
                     JOIN permissions p ON p.id = rp.permission_id
                     WHERE rp.role_id = r.id),
                    ARRAY[]::text[]
                ) AS permission_codes
            FROM roles r
            WHERE {ROLE_SEARCH}
            ORDER BY r.id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern.as_deref())
        .bind(query.page.limit)
        .bind(query.page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            rows: rows
                .into_iter()
                .map(RoleSummaryRow::try_into_summary)
                .collect::<Result<_, _>>()?,
            total,
        })
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleDetail>, sqlx::Error> {
        let row: Option<RoleDetailRow> = sqlx::query_as(
            r#"
            SELECT
                r.id, r.code, r.name, r.description, r.editorial_access,
                r.created_at, r.updated_at,
                COALESCE(
                    (SELECT array_agg(rp.permission_id ORDER BY rp.permission_id)
                     FROM role_permissions rp
                     WHERE rp.role_id = r.id),
                    ARRAY[]::int[]
                ) AS permission_ids,
                COALESCE(
                    (SELECT array_agg(p.code ORDER BY p.code)
                     FROM role_permissions rp
                     JOIN permissions p ON p.id = rp.permission_id
                     WHERE rp.role_id = r.id),
                    ARRAY[]::text[]
                ) AS permission_codes
            FROM roles r
            WHERE r.id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RoleDetailRow::try_into_detail).transpose()
    }

    async fn role_options(&self, search: Option<&str>) -> Result<Vec<RoleOption>, sqlx::Error> {
        let pattern = like_pattern(search);
        let rows: Vec<RoleOptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT r.id, r.code, r.name, r.description
            FROM roles r
            WHERE {ROLE_SEARCH}
            ORDER BY r.name, r.code
            "#
        ))
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RoleOption {
                    id: decode_key(row.id, RoleId::new, "role")?,
                    code: row.code,
                    name: row.name,
                    description: row.description,
                })
            })
            .collect()
    }

    async fn list_permissions(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PermissionSummary>, sqlx::Error> {
        let pattern = like_pattern(query.search.as_deref());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM permissions p WHERE {PERMISSION_SEARCH}"
        ))
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<PermissionSummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT
                p.id, p.code, p.name, p.group_label, p.created_at, p.updated_at,
                (SELECT COUNT(*) FROM role_permissions rp WHERE rp.permission_id = p.id)
                    AS role_count,
                COALESCE(
                    (SELECT array_agg(r.code ORDER BY r.code)
                     FROM role_permissions rp
                     JOIN roles r ON r.id = rp.role_id
                     WHERE rp.permission_id = p.id),
                    ARRAY[]::text[]
                ) AS role_codes
            FROM permissions p
            WHERE {PERMISSION_SEARCH}
            ORDER BY p.id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern.as_deref())
        .bind(query.page.limit)
        .bind(query.page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            rows: rows
                .into_iter()
                .map(PermissionSummaryRow::try_into_summary)
                .collect::<Result<_, _>>()?,
            total,
        })
    }

    async fn permission_by_id(
        &self,
        id: PermissionId,
    ) -> Result<Option<PermissionDetail>, sqlx::Error> {
        let row: Option<PermissionDetailRow> = sqlx::query_as(
            r#"
            SELECT
                p.id, p.code, p.name, p.group_label, p.created_at, p.updated_at,
                COALESCE(
                    (SELECT array_agg(rp.role_id ORDER BY rp.role_id)
                     FROM role_permissions rp
                     WHERE rp.permission_id = p.id),
                    ARRAY[]::int[]
                ) AS role_ids,
                COALESCE(
                    (SELECT array_agg(r.code ORDER BY r.code)
                     FROM role_permissions rp
                     JOIN roles r ON r.id = rp.role_id
                     WHERE rp.permission_id = p.id),
                    ARRAY[]::text[]
                ) AS role_codes
            FROM permissions p
            WHERE p.id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PermissionDetailRow::try_into_detail).transpose()
    }

    async fn permission_options(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<PermissionOption>, sqlx::Error> {
        let pattern = like_pattern(search);
        let rows: Vec<PermissionOptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT p.id, p.code, p.name, p.group_label
            FROM permissions p
            WHERE {PERMISSION_SEARCH}
            ORDER BY COALESCE(p.group_label, ''), p.name, p.code
            "#
        ))
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PermissionOption {
                    id: decode_key(row.id, PermissionId::new, "permission")?,
                    code: row.code,
                    name: row.name,
                    group_label: row.group_label,
                })
            })
            .collect()
    }
}
