use chrono::SecondsFormat;
use workix_application::{AuditLogEntry, AuditLogPage};
use workix_domain::{Permission, Role, RoleAssignment};

use super::{
    AuditLogEntryResponse, AuditLogPageResponse, PermissionResponse, RoleAssignmentResponse,
    RoleResponse,
};

fn rfc3339(value: chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().as_str().to_owned(),
            resource: value.resource().to_owned(),
            action: value.action().to_owned(),
            description: value.description().map(str::to_owned),
            is_active: value.is_active(),
            created_at: rfc3339(value.created_at()),
        }
    }
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().to_owned(),
            description: value.description().map(str::to_owned),
            level: value.level(),
            is_active: value.is_active(),
            is_system: value.is_system(),
            permissions: value
                .permissions()
                .iter()
                .cloned()
                .map(PermissionResponse::from)
                .collect(),
            created_at: rfc3339(value.created_at()),
        }
    }
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            id: value.id().to_string(),
            user_id: value.user_id().to_string(),
            role_id: value.role_id().to_string(),
            assigned_by: value.assigned_by().map(|actor| actor.to_string()),
            expires_at: value.expires_at().map(rfc3339),
            created_at: rfc3339(value.created_at()),
        }
    }
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id.map(|user_id| user_id.to_string()),
            action: value.action,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            changes: value.changes,
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            metadata: value.metadata,
            created_at: rfc3339(value.created_at),
        }
    }
}

impl From<AuditLogPage> for AuditLogPageResponse {
    fn from(value: AuditLogPage) -> Self {
        Self {
            entries: value
                .entries
                .into_iter()
                .map(AuditLogEntryResponse::from)
                .collect(),
            total: value.total,
            page: value.page,
            limit: value.limit,
            total_pages: value.total_pages,
            action_types: value.action_types,
            entity_types: value.entity_types,
        }
    }
}
