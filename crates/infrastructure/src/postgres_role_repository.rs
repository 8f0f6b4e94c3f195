use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use workix_application::{RoleRepository, RoleUpdate, UserRoleBinding};
use workix_core::{AppError, AppResult, UserId};
use workix_domain::{Permission, PermissionId, PermissionName, Role, RoleAssignment, RoleId};

mod assignments;

/// PostgreSQL-backed repository for roles and user-role assignments.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: Uuid,
    role_name: String,
    description: Option<String>,
    level: i16,
    is_active: bool,
    is_system: bool,
    created_at: DateTime<Utc>,
    permission_id: Option<Uuid>,
    permission_name: Option<String>,
    permission_description: Option<String>,
    permission_is_active: Option<bool>,
    permission_created_at: Option<DateTime<Utc>>,
}

const ROLE_SELECT: &str = r#"
    SELECT
        roles.id AS role_id,
        roles.name AS role_name,
        roles.description,
        roles.level,
        roles.is_active,
        roles.is_system,
        roles.created_at,
        permissions.id AS permission_id,
        permissions.name AS permission_name,
        permissions.description AS permission_description,
        permissions.is_active AS permission_is_active,
        permissions.created_at AS permission_created_at
    FROM rbac_roles AS roles
    LEFT JOIN rbac_role_permissions AS grants
        ON grants.role_id = roles.id
    LEFT JOIN rbac_permissions AS permissions
        ON permissions.id = grants.permission_id
"#;

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_roles (id, name, description, level, is_active, is_system, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.description())
        .bind(role.level() as i16)
        .bind(role.is_active())
        .bind(role.is_system())
        .bind(role.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_role_name_conflict(error, role.name()))?;

        Ok(())
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE ($1 OR roles.is_active)");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        fold_roles(rows)
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE roles.name = $1");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        Ok(fold_roles(rows)?.into_iter().next())
    }

    async fn find_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE roles.id = $1");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        Ok(fold_roles(rows)?.into_iter().next())
    }

    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role> {
        let updated_name = update.name.clone().unwrap_or_default();
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_roles SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                level = COALESCE($4, level),
                is_active = COALESCE($5, is_active)
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(update.name)
        .bind(update.description)
        .bind(update.level.map(|level| level as i16))
        .bind(update.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| map_role_name_conflict(error, updated_name.as_str()))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        self.find_role_by_id(role_id).await?.ok_or_else(|| {
            AppError::Internal(format!("failed to reload role '{role_id}' after update"))
        })
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM rbac_roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        Ok(())
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        self.insert_assignment_guarded(assignment).await
    }

    async fn list_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleBinding>> {
        self.fetch_assignments_for_user(user_id).await
    }

    async fn delete_assignments(&self, user_id: UserId, role_id: RoleId) -> AppResult<u64> {
        let rows_affected = sqlx::query(
            "DELETE FROM rbac_user_role_assignments WHERE user_id = $1 AND role_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role assignments: {error}"))
        })?
        .rows_affected();

        Ok(rows_affected)
    }
}

struct RoleDraft {
    role: Role,
    permissions: Vec<Permission>,
}

fn fold_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut by_id: HashMap<Uuid, RoleDraft> = HashMap::new();

    for row in rows {
        let draft = match by_id.entry(row.role_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let role = Role::new(
                    RoleId::from_uuid(row.role_id),
                    row.role_name.clone(),
                    row.description.clone(),
                    stored_level(row.level)?,
                    row.is_active,
                    row.is_system,
                    Vec::new(),
                    row.created_at,
                )
                .map_err(|error| {
                    AppError::Internal(format!(
                        "invalid stored role '{}': {error}",
                        row.role_name
                    ))
                })?;

                entry.insert(RoleDraft {
                    role,
                    permissions: Vec::new(),
                })
            }
        };

        if let Some(permission) = permission_from_row(
            row.permission_id,
            row.permission_name,
            row.permission_description,
            row.permission_is_active,
            row.permission_created_at,
        )? {
            draft.permissions.push(permission);
        }
    }

    let mut roles: Vec<Role> = by_id
        .into_values()
        .map(|draft| draft.role.with_permissions(draft.permissions))
        .collect();
    roles.sort_by(|left, right| {
        right
            .level()
            .cmp(&left.level())
            .then_with(|| left.name().cmp(right.name()))
    });

    Ok(roles)
}

fn permission_from_row(
    id: Option<Uuid>,
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
) -> AppResult<Option<Permission>> {
    let (Some(id), Some(name), Some(created_at)) = (id, name, created_at) else {
        return Ok(None);
    };

    let parsed = PermissionName::new(name.as_str()).map_err(|error| {
        AppError::Internal(format!("invalid stored permission '{name}': {error}"))
    })?;

    Ok(Some(Permission::new(
        PermissionId::from_uuid(id),
        parsed,
        description,
        is_active.unwrap_or(true),
        created_at,
    )))
}

fn stored_level(level: i16) -> AppResult<u16> {
    u16::try_from(level)
        .map_err(|_| AppError::Internal(format!("invalid stored role level {level}")))
}

fn map_role_name_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}
