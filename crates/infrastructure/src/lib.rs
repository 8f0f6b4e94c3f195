//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod bootstrap;
mod in_memory_rbac_store;
mod postgres_audit_log_repository;
mod postgres_permission_repository;
mod postgres_role_repository;

pub use bootstrap::ensure_builtin_roles;
pub use in_memory_rbac_store::InMemoryRbacStore;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_role_repository::PostgresRoleRepository;
