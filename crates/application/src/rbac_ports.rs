//! Repository ports and input/projection types for the RBAC services.

mod audit;
mod inputs;
mod repositories;

pub use audit::{
    ActorContext, AuditLogEntry, AuditLogFilters, AuditLogPage, AuditRecorder, NewAuditLogEntry,
};
pub use inputs::{
    AssignRoleInput, NewPermissionInput, NewRoleInput, PermissionUpdate, RoleUpdate,
};
pub use repositories::{
    AuditLogRepository, PermissionRepository, RoleRepository, UserRoleBinding,
};
