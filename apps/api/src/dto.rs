mod common;
mod rbac;

pub use common::HealthResponse;
pub use rbac::{
    AssignRoleRequest, AuditLogEntryResponse, AuditLogPageResponse, CreateRoleRequest,
    PermissionResponse, RegisterPermissionRequest, RoleAssignmentResponse, RoleResponse,
    UpdatePermissionRequest, UpdateRoleRequest, UserMaxLevelResponse,
};

#[cfg(test)]
mod tests {
    use ts_rs::{Config, TS};

    use crate::error::ErrorResponse;

    use super::{
        AssignRoleRequest, AuditLogEntryResponse, AuditLogPageResponse, CreateRoleRequest,
        HealthResponse, PermissionResponse, RegisterPermissionRequest, RoleAssignmentResponse,
        RoleResponse, UpdatePermissionRequest, UpdateRoleRequest, UserMaxLevelResponse,
    };

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        CreateRoleRequest::export(&config)?;
        UpdateRoleRequest::export(&config)?;
        RegisterPermissionRequest::export(&config)?;
        UpdatePermissionRequest::export(&config)?;
        AssignRoleRequest::export(&config)?;
        RoleResponse::export(&config)?;
        PermissionResponse::export(&config)?;
        RoleAssignmentResponse::export(&config)?;
        UserMaxLevelResponse::export(&config)?;
        AuditLogEntryResponse::export(&config)?;
        AuditLogPageResponse::export(&config)?;
        ErrorResponse::export(&config)?;
        HealthResponse::export(&config)?;

        Ok(())
    }
}
