use std::str::FromStr;

use serde::{Deserialize, Serialize};
use workix_core::AppError;

/// Stable audit actions emitted by RBAC use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role is updated.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role assignment is removed from a user.
    RoleUnassigned,
    /// Emitted when a permission is registered.
    PermissionRegistered,
    /// Emitted when a permission is updated.
    PermissionUpdated,
    /// Emitted when a permission is deleted.
    PermissionDeleted,
    /// Emitted when a permission is granted to a role.
    PermissionGranted,
    /// Emitted when a permission is revoked from a role.
    PermissionRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "rbac.role.created",
            Self::RoleUpdated => "rbac.role.updated",
            Self::RoleDeleted => "rbac.role.deleted",
            Self::RoleAssigned => "rbac.role.assigned",
            Self::RoleUnassigned => "rbac.role.unassigned",
            Self::PermissionRegistered => "rbac.permission.registered",
            Self::PermissionUpdated => "rbac.permission.updated",
            Self::PermissionDeleted => "rbac.permission.deleted",
            Self::PermissionGranted => "rbac.permission.granted",
            Self::PermissionRevoked => "rbac.permission.revoked",
        }
    }
}

/// Sortable columns for audit log listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSortKey {
    /// Sort by entry timestamp.
    CreatedAt,
    /// Sort by acting user.
    UserId,
    /// Sort by action identifier.
    Action,
}

impl AuditSortKey {
    /// Returns a stable storage value for this sort key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UserId => "user_id",
            Self::Action => "action",
        }
    }
}

impl FromStr for AuditSortKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created_at" => Ok(Self::CreatedAt),
            "user_id" => Ok(Self::UserId),
            "action" => Ok(Self::Action),
            _ => Err(AppError::Validation(format!(
                "unknown audit sort key '{value}'"
            ))),
        }
    }
}

/// Sort direction for audit log listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Returns a stable storage value for this direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort order '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AuditAction, AuditSortKey};

    #[test]
    fn audit_action_has_stable_storage_value() {
        assert_eq!(AuditAction::RoleAssigned.as_str(), "rbac.role.assigned");
    }

    #[test]
    fn sort_key_roundtrips_storage_value() {
        let key = AuditSortKey::UserId;
        let restored = AuditSortKey::from_str(key.as_str());
        assert!(restored.is_ok());
        assert_eq!(restored.unwrap_or(AuditSortKey::CreatedAt), key);
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        assert!(AuditSortKey::from_str("entity_type").is_err());
    }
}
