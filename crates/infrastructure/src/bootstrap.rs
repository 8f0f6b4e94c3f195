use chrono::Utc;
use tracing::info;

use workix_application::RoleRepository;
use workix_core::{AppError, AppResult};
use workix_domain::{ROLE_LEVEL_MAX, Role, RoleId};

const BUILTIN_ROLES: &[(&str, u16, &str)] = &[
    ("admin", ROLE_LEVEL_MAX, "Platform administrator with full access"),
    ("user", 0, "Default platform user"),
];

/// Seeds the system roles the platform ships with.
///
/// Idempotent: existing roles are left untouched, and a concurrent seeding
/// race resolves through the storage-level name conflict.
pub async fn ensure_builtin_roles(repository: &dyn RoleRepository) -> AppResult<()> {
    for (name, level, description) in BUILTIN_ROLES {
        if repository.find_role_by_name(name).await?.is_some() {
            continue;
        }

        let role = Role::new(
            RoleId::new(),
            *name,
            Some((*description).to_owned()),
            *level,
            true,
            true,
            Vec::new(),
            Utc::now(),
        )?;

        match repository.insert_role(role).await {
            Ok(()) => info!(role = name, "seeded built-in system role"),
            Err(AppError::Conflict(_)) => {}
            Err(error) => return Err(error),
        }
    }

    Ok(())
}
