use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workix_core::{AppError, AppResult};

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated permission name following the `resource:action` convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionName {
    name: String,
    resource: String,
    action: String,
}

impl PermissionName {
    /// Parses a `resource:action` pair into a permission name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let mut parts = trimmed.splitn(2, ':');
        let resource = parts.next().unwrap_or_default().trim();
        let action = parts.next().unwrap_or_default().trim();

        if resource.is_empty() || action.is_empty() || action.contains(':') {
            return Err(AppError::Validation(format!(
                "permission name '{trimmed}' must follow the 'resource:action' convention"
            )));
        }

        Ok(Self {
            name: format!("{resource}:{action}"),
            resource: resource.to_owned(),
            action: action.to_owned(),
        })
    }

    /// Returns the full `resource:action` name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the resource half of the name.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the action half of the name.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }
}

impl FromStr for PermissionName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl Display for PermissionName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.name)
    }
}

/// An atomic capability grantable to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    name: PermissionName,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Permission {
    /// Creates a permission from validated parts.
    #[must_use]
    pub fn new(
        id: PermissionId,
        name: PermissionName,
        description: Option<String>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            is_active,
            created_at,
        }
    }

    /// Returns the stable permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the validated permission name.
    #[must_use]
    pub fn name(&self) -> &PermissionName {
        &self.name
    }

    /// Returns the resource this permission applies to.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.name.resource()
    }

    /// Returns the action this permission allows.
    #[must_use]
    pub fn action(&self) -> &str {
        self.name.action()
    }

    /// Returns the optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the permission is active (soft-delete flag).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
