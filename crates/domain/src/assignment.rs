use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workix_core::UserId;

use crate::RoleId;

/// Unique identifier for a user-role assignment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Temporal grant binding a role to a user.
///
/// An expired assignment stays persisted but never contributes to the user's
/// effective roles; every read filters by time "as of now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    id: AssignmentId,
    user_id: UserId,
    role_id: RoleId,
    assigned_by: Option<UserId>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Creates an assignment record.
    #[must_use]
    pub fn new(
        id: AssignmentId,
        user_id: UserId,
        role_id: RoleId,
        assigned_by: Option<UserId>,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            role_id,
            assigned_by,
            expires_at,
            created_at,
        }
    }

    /// Returns the stable assignment identifier.
    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    /// Returns the user holding the grant.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the actor that created the grant, when recorded.
    #[must_use]
    pub fn assigned_by(&self) -> Option<UserId> {
        self.assigned_by
    }

    /// Returns the expiry timestamp, when the grant is time-bounded.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the grant is effective at the given instant.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at >= now,
        }
    }

    /// Returns whether the grant has no expiry.
    #[must_use]
    pub fn is_open_ended(&self) -> bool {
        self.expires_at.is_none()
    }
}
