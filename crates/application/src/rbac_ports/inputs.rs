use chrono::{DateTime, Utc};
use workix_core::UserId;
use workix_domain::{PermissionName, RoleId};

/// Input payload for creating roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Optional hierarchy level weight, defaults to 0.
    pub level: Option<u16>,
}

/// Partial update applied to an existing role.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New unique role name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New hierarchy level weight; rejected for system roles.
    pub level: Option<u16>,
    /// New soft-delete flag.
    pub is_active: Option<bool>,
}

/// Input payload for registering permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermissionInput {
    /// Unique `resource:action` permission name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
}

/// Partial update applied to an existing permission.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionUpdate {
    /// New validated permission name.
    pub name: Option<PermissionName>,
    /// New description.
    pub description: Option<String>,
    /// New soft-delete flag.
    pub is_active: Option<bool>,
}

/// Input payload for assigning a role to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Role to grant.
    pub role_id: RoleId,
    /// Optional expiry; an open-ended grant when absent.
    pub expires_at: Option<DateTime<Utc>>,
    /// Actor that created the grant, for the audit trail.
    pub assigned_by: Option<UserId>,
}
