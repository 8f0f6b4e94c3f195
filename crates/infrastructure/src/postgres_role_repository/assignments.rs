use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use workix_application::UserRoleBinding;
use workix_core::{AppError, AppResult, UserId};
use workix_domain::{AssignmentId, Permission, Role, RoleAssignment, RoleId};

use super::{PostgresRoleRepository, permission_from_row, stored_level};

#[derive(Debug, FromRow)]
struct AssignmentRow {
    assignment_id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    assigned_by: Option<Uuid>,
    expires_at: Option<DateTime<Utc>>,
    assigned_at: DateTime<Utc>,
    role_name: String,
    role_description: Option<String>,
    level: i16,
    is_active: bool,
    is_system: bool,
    role_created_at: DateTime<Utc>,
    permission_id: Option<Uuid>,
    permission_name: Option<String>,
    permission_description: Option<String>,
    permission_is_active: Option<bool>,
    permission_created_at: Option<DateTime<Utc>>,
}

impl PostgresRoleRepository {
    pub(super) async fn insert_assignment_guarded(
        &self,
        assignment: RoleAssignment,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO rbac_user_role_assignments
                (id, user_id, role_id, assigned_by, expires_at, created_at)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (
                SELECT 1
                FROM rbac_user_role_assignments
                WHERE user_id = $2 AND role_id = $3 AND expires_at IS NULL
            )
            "#,
        )
        .bind(assignment.id().as_uuid())
        .bind(assignment.user_id().as_uuid())
        .bind(assignment.role_id().as_uuid())
        .bind(assignment.assigned_by().map(|actor| actor.as_uuid()))
        .bind(assignment.expires_at())
        .bind(assignment.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_assignment_conflict(error, &assignment))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(open_ended_conflict(&assignment));
        }

        Ok(())
    }

    pub(super) async fn fetch_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleBinding>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                assignments.id AS assignment_id,
                assignments.user_id,
                assignments.role_id,
                assignments.assigned_by,
                assignments.expires_at,
                assignments.created_at AS assigned_at,
                roles.name AS role_name,
                roles.description AS role_description,
                roles.level,
                roles.is_active,
                roles.is_system,
                roles.created_at AS role_created_at,
                permissions.id AS permission_id,
                permissions.name AS permission_name,
                permissions.description AS permission_description,
                permissions.is_active AS permission_is_active,
                permissions.created_at AS permission_created_at
            FROM rbac_user_role_assignments AS assignments
            INNER JOIN rbac_roles AS roles
                ON roles.id = assignments.role_id
            LEFT JOIN rbac_role_permissions AS grants
                ON grants.role_id = roles.id
            LEFT JOIN rbac_permissions AS permissions
                ON permissions.id = grants.permission_id
            WHERE assignments.user_id = $1
            ORDER BY assignments.created_at, permissions.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role assignments: {error}"))
        })?;

        fold_assignments(rows)
    }
}

struct BindingDraft {
    assignment: RoleAssignment,
    role: Role,
    permissions: Vec<Permission>,
}

fn fold_assignments(rows: Vec<AssignmentRow>) -> AppResult<Vec<UserRoleBinding>> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: HashMap<Uuid, BindingDraft> = HashMap::new();

    for row in rows {
        let draft = match by_id.entry(row.assignment_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(row.assignment_id);

                let assignment = RoleAssignment::new(
                    AssignmentId::from_uuid(row.assignment_id),
                    UserId::from_uuid(row.user_id),
                    RoleId::from_uuid(row.role_id),
                    row.assigned_by.map(UserId::from_uuid),
                    row.expires_at,
                    row.assigned_at,
                );

                let role = Role::new(
                    RoleId::from_uuid(row.role_id),
                    row.role_name.clone(),
                    row.role_description.clone(),
                    stored_level(row.level)?,
                    row.is_active,
                    row.is_system,
                    Vec::new(),
                    row.role_created_at,
                )
                .map_err(|error| {
                    AppError::Internal(format!(
                        "invalid stored role '{}': {error}",
                        row.role_name
                    ))
                })?;

                entry.insert(BindingDraft {
                    assignment,
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

    Ok(order
        .into_iter()
        .filter_map(|assignment_id| by_id.remove(&assignment_id))
        .map(|draft| UserRoleBinding {
            assignment: draft.assignment,
            role: draft.role.with_permissions(draft.permissions),
        })
        .collect())
}

fn map_assignment_conflict(error: sqlx::Error, assignment: &RoleAssignment) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return open_ended_conflict(assignment);
    }

    AppError::Internal(format!("failed to persist role assignment: {error}"))
}

fn open_ended_conflict(assignment: &RoleAssignment) -> AppError {
    AppError::Conflict(format!(
        "user '{}' already holds an open-ended assignment for role '{}'",
        assignment.user_id(),
        assignment.role_id()
    ))
}
