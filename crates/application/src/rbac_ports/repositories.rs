use async_trait::async_trait;
use workix_core::{AppResult, UserId};
use workix_domain::{Permission, PermissionId, Role, RoleAssignment, RoleId};

use super::audit::{AuditLogEntry, AuditLogFilters};
use super::inputs::{PermissionUpdate, RoleUpdate};

/// Assignment row joined with its role and the role's permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoleBinding {
    /// The temporal grant.
    pub assignment: RoleAssignment,
    /// The granted role with permissions eagerly loaded.
    pub role: Role,
}

/// Repository port for roles and user-role assignments.
///
/// Uniqueness rules live in the storage layer: implementations surface
/// constraint violations as `Conflict` instead of relying on callers to
/// check-then-create.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a role; `Conflict` when the name is already taken.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Lists roles ordered by level descending, with permissions loaded.
    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>>;

    /// Finds a role by unique name, with permissions loaded.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Finds a role by identifier, with permissions loaded.
    async fn find_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Applies a partial update; `NotFound` when the role is absent,
    /// `Conflict` when a name change collides.
    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role>;

    /// Deletes a role and its assignments; `NotFound` when absent.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Persists an assignment; `Conflict` when an open-ended assignment for
    /// the same user and role already exists.
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Lists every assignment row for a user, active or not, with the role
    /// and its permissions eagerly joined.
    async fn list_assignments_for_user(&self, user_id: UserId)
    -> AppResult<Vec<UserRoleBinding>>;

    /// Removes all assignments binding the user to the role, returning how
    /// many rows were deleted.
    async fn delete_assignments(&self, user_id: UserId, role_id: RoleId) -> AppResult<u64>;
}

/// Repository port for permissions and role-permission grants.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Persists a permission; `Conflict` when the name is already taken.
    async fn insert_permission(&self, permission: Permission) -> AppResult<()>;

    /// Lists permissions ordered by resource then name.
    async fn list_permissions(&self, include_inactive: bool) -> AppResult<Vec<Permission>>;

    /// Finds a permission by unique name.
    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>>;

    /// Finds a permission by identifier.
    async fn find_permission_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    /// Lists active permissions for one resource.
    async fn list_resource_permissions(&self, resource: &str) -> AppResult<Vec<Permission>>;

    /// Attaches a permission to a role; idempotent when already granted.
    async fn grant_to_role(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()>;

    /// Detaches a permission from a role; a no-op when not granted.
    async fn revoke_from_role(&self, role_id: RoleId, permission_id: PermissionId)
    -> AppResult<()>;

    /// Applies a partial update; `NotFound` when the permission is absent,
    /// `Conflict` when a name change collides.
    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission>;

    /// Deletes a permission and its grants; `NotFound` when absent.
    async fn delete_permission(&self, id: PermissionId) -> AppResult<()>;
}

/// Repository port for reading the append-only audit log.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists entries matching the filters plus the total match count.
    async fn list_entries(
        &self,
        filters: AuditLogFilters,
    ) -> AppResult<(Vec<AuditLogEntry>, u64)>;

    /// Returns the distinct action identifiers across all history.
    async fn distinct_action_types(&self) -> AppResult<Vec<String>>;

    /// Returns the distinct entity kinds across all history.
    async fn distinct_entity_types(&self) -> AppResult<Vec<String>>;
}
