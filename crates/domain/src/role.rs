use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workix_core::{AppError, AppResult, NonEmptyString};

use crate::Permission;

/// Highest role hierarchy level supported by the platform.
pub const ROLE_LEVEL_MAX: u16 = 1000;

/// Validates a role hierarchy level against the supported range.
pub fn validate_role_level(level: u16) -> AppResult<u16> {
    if level > ROLE_LEVEL_MAX {
        return Err(AppError::Validation(format!(
            "role level {level} exceeds the maximum of {ROLE_LEVEL_MAX}"
        )));
    }

    Ok(level)
}

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named, leveled bundle of permissions, optionally system-protected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    description: Option<String>,
    level: u16,
    is_active: bool,
    is_system: bool,
    permissions: Vec<Permission>,
    created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a role with validated name and level.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
        level: u16,
        is_active: bool,
        is_system: bool,
        permissions: Vec<Permission>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description,
            level: validate_role_level(level)?,
            is_active,
            is_system,
            permissions,
            created_at,
        })
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the hierarchy level weight.
    #[must_use]
    pub fn level(&self) -> u16 {
        self.level
    }

    /// Returns whether the role is active (soft-delete flag).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns whether the role is system-managed and protected.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns the permission set attached to the role.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_slice()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the attached permission set.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Returns whether the role carries a permission with the given name.
    #[must_use]
    pub fn has_permission_named(&self, name: &str) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.name().as_str() == name)
    }

    /// Returns whether the role carries a permission for the resource/action pair.
    #[must_use]
    pub fn has_resource_action(&self, resource: &str, action: &str) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.resource() == resource && permission.action() == action)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{ROLE_LEVEL_MAX, Role, RoleId, validate_role_level};

    #[test]
    fn rejects_level_above_maximum() {
        assert!(validate_role_level(ROLE_LEVEL_MAX).is_ok());
        assert!(validate_role_level(ROLE_LEVEL_MAX + 1).is_err());
    }

    #[test]
    fn rejects_blank_name() {
        let role = Role::new(
            RoleId::new(),
            "  ",
            None,
            0,
            true,
            false,
            Vec::new(),
            Utc::now(),
        );
        assert!(role.is_err());
    }
}
