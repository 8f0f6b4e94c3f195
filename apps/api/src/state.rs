use workix_application::{AuditLogService, PermissionService, RoleService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_service: RoleService,
    pub permission_service: PermissionService,
    pub audit_log_service: AuditLogService,
}
