//! Application services and repository ports.

#![forbid(unsafe_code)]

mod audit_log_service;
mod permission_service;
mod rbac_ports;
mod role_service;

pub use audit_log_service::AuditLogService;
pub use permission_service::PermissionService;
pub use rbac_ports::{
    ActorContext, AssignRoleInput, AuditLogEntry, AuditLogFilters, AuditLogPage,
    AuditLogRepository, AuditRecorder, NewAuditLogEntry, NewPermissionInput, NewRoleInput,
    PermissionRepository, PermissionUpdate, RoleRepository, RoleUpdate, UserRoleBinding,
};
pub use role_service::RoleService;
