//! Postgres user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kateglo_core::{RoleId, UserId};
use kateglo_platform_access::role::{ADMIN, USER};
use kateglo_platform_access::{AdminEmails, ProviderProfile, RoleGrant, User, UserDirectory};
use sqlx::{FromRow, PgPool};

use super::decode_key;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: i32,
    google_id: String,
    email: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    role_id: Option<i32>,
    active: bool,
    last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        Ok(User {
            id: decode_key(self.id, UserId::new, "user")?,
            provider_subject: self.google_id,
            email: self.email,
            name: self.name,
            avatar_url: self.avatar_url,
            role_id: self.role_id.and_then(RoleId::new),
            active: self.active,
            last_login_at: self.last_login_at,
        })
    }
}

/// User directory backed by the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
    admin_emails: AdminEmails,
}

impl PgUserDirectory {
    /// Creates a directory promoting `admin_emails` on login.
    pub fn new(pool: PgPool, admin_emails: AdminEmails) -> Self {
        Self { pool, admin_emails }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    type Error = sqlx::Error;

    async fn upsert_from_provider(&self, profile: &ProviderProfile) -> Result<User, sqlx::Error> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (google_id, email, name, avatar_url, role_id, last_login_at)
            VALUES ($1, $2, $3, $4, (SELECT id FROM roles WHERE code = $5), NOW())
            ON CONFLICT (google_id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                avatar_url = EXCLUDED.avatar_url,
                last_login_at = NOW(),
                updated_at = NOW()
            RETURNING id, google_id, email, name, avatar_url, role_id, active, last_login_at
            "#,
        )
        .bind(&profile.id)
        .bind(profile.email.as_deref())
        .bind(profile.name.as_deref())
        .bind(profile.picture.as_deref())
        .bind(USER)
        .fetch_one(&self.pool)
        .await?;

        row.try_into_user()
    }

    async fn bootstrap_privileged_role(&self, mut user: User) -> Result<User, sqlx::Error> {
        let listed = user
            .email
            .as_deref()
            .is_some_and(|email| self.admin_emails.contains(email));
        if !listed {
            return Ok(user);
        }

        let admin_role: Option<i32> = sqlx::query_scalar("SELECT id FROM roles WHERE code = $1")
            .bind(ADMIN)
            .fetch_optional(&self.pool)
            .await?;
        let Some(admin_role) = admin_role.and_then(RoleId::new) else {
            tracing::warn!(user_id = %user.id, "Bootstrap admin requested but no admin role exists");
            return Ok(user);
        };

        if user.role_id != Some(admin_role) {
            sqlx::query("UPDATE users SET role_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(admin_role.get())
                .bind(user.id.get())
                .execute(&self.pool)
                .await?;
            tracing::info!(user_id = %user.id, "Promoted bootstrap administrator");
            user.role_id = Some(admin_role);
        }

        Ok(user)
    }

    async fn resolve_role_for_token(
        &self,
        role_id: Option<RoleId>,
    ) -> Result<RoleGrant, sqlx::Error> {
        let Some(role_id) = role_id else {
            return Ok(RoleGrant::fallback());
        };

        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT code, editorial_access FROM roles WHERE id = $1")
                .bind(role_id.get())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .map(|(code, editorial_access)| RoleGrant {
                code,
                editorial_access,
            })
            .unwrap_or_else(RoleGrant::fallback))
    }

    async fn list_permission_codes(&self, role_id: RoleId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.code
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.code
            "#,
        )
        .bind(role_id.get())
        .fetch_all(&self.pool)
        .await
    }
}
