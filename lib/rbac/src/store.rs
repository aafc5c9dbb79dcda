//! Role and permission store.
//!
//! [`RbacStore`] holds the list, lookup, and upsert algorithms; storage is
//! reached through [`RbacBackend`] so the same logic runs against Postgres in
//! the server and against in-memory fakes in tests.

use async_trait::async_trait;
use kateglo_core::{PermissionId, RoleId};
use tracing::instrument;

use crate::transaction::{Transaction, in_transaction};
use crate::types::{
    ListQuery, Page, PermissionDetail, PermissionDraft, PermissionOption, PermissionSummary,
    RoleDetail, RoleDraft, RoleOption, RoleSummary,
};

/// Writes performed inside an upsert transaction.
#[async_trait]
pub trait RelationWriter: Transaction {
    /// Updates the role when `draft.id` is set, otherwise inserts it.
    /// Returns `None` when the target row does not exist.
    async fn save_role(&mut self, draft: &RoleDraft) -> Result<Option<RoleId>, Self::Error>;

    async fn clear_role_permissions(&mut self, role: RoleId) -> Result<(), Self::Error>;

    /// Inserts all pairs in a single statement.
    async fn insert_role_permissions(
        &mut self,
        role: RoleId,
        permissions: &[i32],
    ) -> Result<(), Self::Error>;

    /// Updates the permission when `draft.id` is set, otherwise inserts it.
    /// Returns `None` when the target row does not exist.
    async fn save_permission(
        &mut self,
        draft: &PermissionDraft,
    ) -> Result<Option<PermissionId>, Self::Error>;

    async fn clear_permission_roles(&mut self, permission: PermissionId)
    -> Result<(), Self::Error>;

    /// Inserts all pairs in a single statement.
    async fn insert_permission_roles(
        &mut self,
        permission: PermissionId,
        roles: &[i32],
    ) -> Result<(), Self::Error>;
}

/// Storage behind [`RbacStore`].
#[async_trait]
pub trait RbacBackend: Send + Sync {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Transaction type used by upserts.
    type Tx: RelationWriter<Error = Self::Error>;

    /// Acquires a dedicated connection and begins a transaction on it.
    async fn begin(&self) -> Result<Self::Tx, Self::Error>;

    async fn list_roles(&self, query: &ListQuery) -> Result<Page<RoleSummary>, Self::Error>;

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleDetail>, Self::Error>;

    /// Roles for pickers, ordered by name then code.
    async fn role_options(&self, search: Option<&str>) -> Result<Vec<RoleOption>, Self::Error>;

    async fn list_permissions(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PermissionSummary>, Self::Error>;

    async fn permission_by_id(
        &self,
        id: PermissionId,
    ) -> Result<Option<PermissionDetail>, Self::Error>;

    /// Permissions for pickers, ordered by group, name, then code.
    async fn permission_options(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<PermissionOption>, Self::Error>;
}

/// Role and permission administration.
#[derive(Debug, Clone)]
pub struct RbacStore<B> {
    backend: B,
}

impl<B: RbacBackend> RbacStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn list_roles(&self, query: &ListQuery) -> Result<Page<RoleSummary>, B::Error> {
        self.backend.list_roles(query).await
    }

    pub async fn role(&self, id: RoleId) -> Result<Option<RoleDetail>, B::Error> {
        self.backend.role_by_id(id).await
    }

    pub async fn role_options(&self, search: Option<&str>) -> Result<Vec<RoleOption>, B::Error> {
        self.backend.role_options(search).await
    }

    /// Saves a role and replaces its permission set with exactly
    /// `draft.permission_ids`.
    ///
    /// Returns `None` when `draft.id` names a missing role. Readers never see
    /// a half-written permission set.
    #[instrument(skip(self, draft), fields(role_id = ?draft.id, code = %draft.code))]
    pub async fn upsert_role(&self, draft: RoleDraft) -> Result<Option<RoleDetail>, B::Error> {
        let saved = in_transaction(self.backend.begin(), move |tx| {
            Box::pin(async move {
                let Some(id) = tx.save_role(&draft).await? else {
                    return Ok(None);
                };
                tx.clear_role_permissions(id).await?;
                if !draft.permission_ids.is_empty() {
                    tx.insert_role_permissions(id, draft.permission_ids.as_slice())
                        .await?;
                }
                Ok(Some(id))
            })
        })
        .await?;

        match saved {
            Some(id) => {
                tracing::info!(role_id = %id, "Role saved");
                self.backend.role_by_id(id).await
            }
            None => {
                tracing::debug!("Role not found");
                Ok(None)
            }
        }
    }

    pub async fn list_permissions(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PermissionSummary>, B::Error> {
        self.backend.list_permissions(query).await
    }

    pub async fn permission(&self, id: PermissionId) -> Result<Option<PermissionDetail>, B::Error> {
        self.backend.permission_by_id(id).await
    }

    pub async fn permission_options(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<PermissionOption>, B::Error> {
        self.backend.permission_options(search).await
    }

    /// Saves a permission and replaces its role set with exactly
    /// `draft.role_ids`.
    ///
    /// Returns `None` when `draft.id` names a missing permission.
    #[instrument(skip(self, draft), fields(permission_id = ?draft.id, code = %draft.code))]
    pub async fn upsert_permission(
        &self,
        draft: PermissionDraft,
    ) -> Result<Option<PermissionDetail>, B::Error> {
        let saved = in_transaction(self.backend.begin(), move |tx| {
            Box::pin(async move {
                let Some(id) = tx.save_permission(&draft).await? else {
                    return Ok(None);
                };
                tx.clear_permission_roles(id).await?;
                if !draft.role_ids.is_empty() {
                    tx.insert_permission_roles(id, draft.role_ids.as_slice())
                        .await?;
                }
                Ok(Some(id))
            })
        })
        .await?;

        match saved {
            Some(id) => {
                tracing::info!(permission_id = %id, "Permission saved");
                self.backend.permission_by_id(id).await
            }
            None => {
                tracing::debug!("Permission not found");
                Ok(None)
            }
        }
    }
}
