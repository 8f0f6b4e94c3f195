use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

mod conversions;

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../../console/src/generated/create-role-request.ts")]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub level: Option<u16>,
}

/// Incoming payload for partial role updates.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../../console/src/generated/update-role-request.ts")]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<u16>,
    pub is_active: Option<bool>,
}

/// Incoming payload for permission registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/register-permission-request.ts"
)]
pub struct RegisterPermissionRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Incoming payload for partial permission updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/update-permission-request.ts"
)]
pub struct UpdatePermissionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../../console/src/generated/assign-role-request.ts")]
pub struct AssignRoleRequest {
    pub role_id: String,
    pub expires_at: Option<String>,
    pub assigned_by: Option<String>,
}

/// API representation of a permission.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../console/src/generated/permission-response.ts")]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// API representation of a role with its permission set.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../console/src/generated/role-response.ts")]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub level: u16,
    pub is_active: bool,
    pub is_system: bool,
    pub permissions: Vec<PermissionResponse>,
    pub created_at: String,
}

/// API representation of a user-role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub id: String,
    pub user_id: String,
    pub role_id: String,
    pub assigned_by: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

/// API representation of a user's highest active role level.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/user-max-level-response.ts"
)]
pub struct UserMaxLevelResponse {
    pub max_level: u16,
}

/// API representation of one audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: String,
}

/// API representation of one audit log page with filter metadata.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../console/src/generated/audit-log-page-response.ts"
)]
pub struct AuditLogPageResponse {
    pub entries: Vec<AuditLogEntryResponse>,
    pub total: u64,
    pub page: usize,
    pub limit: usize,
    pub total_pages: u64,
    pub action_types: Vec<String>,
    pub entity_types: Vec<String>,
}
