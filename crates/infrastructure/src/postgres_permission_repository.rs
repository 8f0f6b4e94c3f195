use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use workix_application::{PermissionRepository, PermissionUpdate};
use workix_core::{AppError, AppResult};
use workix_domain::{Permission, PermissionId, PermissionName, RoleId};

/// PostgreSQL-backed repository for permissions and role grants.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        let name = PermissionName::new(self.name.as_str()).map_err(|error| {
            AppError::Internal(format!("invalid stored permission '{}': {error}", self.name))
        })?;

        Ok(Permission::new(
            PermissionId::from_uuid(self.id),
            name,
            self.description,
            self.is_active,
            self.created_at,
        ))
    }
}

const PERMISSION_SELECT: &str =
    "SELECT id, name, description, is_active, created_at FROM rbac_permissions";

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_permissions
                (id, name, resource, action, description, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.name().as_str())
        .bind(permission.resource())
        .bind(permission.action())
        .bind(permission.description())
        .bind(permission.is_active())
        .bind(permission.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_permission_name_conflict(error, permission.name().as_str()))?;

        Ok(())
    }

    async fn list_permissions(&self, include_inactive: bool) -> AppResult<Vec<Permission>> {
        let sql = format!("{PERMISSION_SELECT} WHERE ($1 OR is_active) ORDER BY resource, name");
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list permissions: {error}"))
            })?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        let sql = format!("{PERMISSION_SELECT} WHERE name = $1");
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to resolve permission: {error}"))
            })?;

        row.map(PermissionRow::into_permission).transpose()
    }

    async fn find_permission_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        let sql = format!("{PERMISSION_SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to resolve permission: {error}"))
            })?;

        row.map(PermissionRow::into_permission).transpose()
    }

    async fn list_resource_permissions(&self, resource: &str) -> AppResult<Vec<Permission>> {
        let sql = format!("{PERMISSION_SELECT} WHERE resource = $1 AND is_active ORDER BY name");
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(resource)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list resource permissions: {error}"))
            })?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn grant_to_role(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_grant_reference_error)?;

        Ok(())
    }

    async fn revoke_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM rbac_role_permissions WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke permission: {error}")))?;

        Ok(())
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        let updated_name = update
            .name
            .as_ref()
            .map(|name| name.as_str().to_owned())
            .unwrap_or_default();
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_permissions SET
                name = COALESCE($2, name),
                resource = COALESCE($3, resource),
                action = COALESCE($4, action),
                description = COALESCE($5, description),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name.as_ref().map(|name| name.as_str().to_owned()))
        .bind(update.name.as_ref().map(|name| name.resource().to_owned()))
        .bind(update.name.as_ref().map(|name| name.action().to_owned()))
        .bind(update.description)
        .bind(update.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| map_permission_name_conflict(error, updated_name.as_str()))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        }

        self.find_permission_by_id(id).await?.ok_or_else(|| {
            AppError::Internal(format!("failed to reload permission '{id}' after update"))
        })
    }

    async fn delete_permission(&self, id: PermissionId) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM rbac_permissions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete permission: {error}"))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        }

        Ok(())
    }
}

fn map_permission_name_conflict(error: sqlx::Error, permission_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "permission '{permission_name}' already exists"
        ));
    }

    AppError::Internal(format!("failed to persist permission: {error}"))
}

fn map_grant_reference_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23503")
    {
        return AppError::NotFound("role or permission was not found".to_owned());
    }

    AppError::Internal(format!("failed to grant permission: {error}"))
}
