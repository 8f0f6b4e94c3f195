use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use workix_core::{AppError, AppResult, UserId};
use workix_domain::{
    Permission, PermissionId, PermissionName, Role, RoleAssignment, RoleId,
};

use crate::rbac_ports::{
    ActorContext, AssignRoleInput, AuditRecorder, NewAuditLogEntry, NewPermissionInput,
    PermissionRepository, PermissionUpdate, RoleRepository, RoleUpdate, UserRoleBinding,
};
use crate::role_service::RoleService;

use super::PermissionService;

#[derive(Default)]
struct FakePermissionRepository {
    permissions: Mutex<Vec<Permission>>,
    grants: Mutex<HashMap<RoleId, HashSet<PermissionId>>>,
}

#[async_trait]
impl PermissionRepository for FakePermissionRepository {
    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.lock().await;

        if permissions
            .iter()
            .any(|stored| stored.name() == permission.name())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name()
            )));
        }

        permissions.push(permission);
        Ok(())
    }

    async fn list_permissions(&self, include_inactive: bool) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .filter(|permission| include_inactive || permission.is_active())
            .cloned()
            .collect())
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .find(|permission| permission.name().as_str() == name)
            .cloned())
    }

    async fn find_permission_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .find(|permission| permission.id() == id)
            .cloned())
    }

    async fn list_resource_permissions(&self, resource: &str) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .filter(|permission| permission.is_active() && permission.resource() == resource)
            .cloned()
            .collect())
    }

    async fn grant_to_role(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        self.grants
            .lock()
            .await
            .entry(role_id)
            .or_default()
            .insert(permission_id);
        Ok(())
    }

    async fn revoke_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        if let Some(granted) = self.grants.lock().await.get_mut(&role_id) {
            granted.remove(&permission_id);
        }
        Ok(())
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        let mut permissions = self.permissions.lock().await;

        let Some(position) = permissions.iter().position(|stored| stored.id() == id) else {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        };

        let current = permissions[position].clone();
        let updated = Permission::new(
            current.id(),
            update.name.unwrap_or_else(|| current.name().clone()),
            update
                .description
                .or_else(|| current.description().map(str::to_owned)),
            update.is_active.unwrap_or_else(|| current.is_active()),
            current.created_at(),
        );

        permissions[position] = updated.clone();
        Ok(updated)
    }

    async fn delete_permission(&self, id: PermissionId) -> AppResult<()> {
        let mut permissions = self.permissions.lock().await;
        let before = permissions.len();
        permissions.retain(|permission| permission.id() != id);

        if permissions.len() == before {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        }

        for granted in self.grants.lock().await.values_mut() {
            granted.remove(&id);
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeRoleRepository {
    roles: Mutex<Vec<Role>>,
    assignments: Mutex<Vec<RoleAssignment>>,
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        self.roles.lock().await.push(role);
        Ok(())
    }

    async fn list_roles(&self, _include_inactive: bool) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.name() == name)
            .cloned())
    }

    async fn find_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.id() == role_id)
            .cloned())
    }

    async fn update_role(&self, role_id: RoleId, _update: RoleUpdate) -> AppResult<Role> {
        Err(AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.roles.lock().await.retain(|role| role.id() != role_id);
        Ok(())
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        self.assignments.lock().await.push(assignment);
        Ok(())
    }

    async fn list_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleBinding>> {
        let roles = self.roles.lock().await;

        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| assignment.user_id() == user_id)
            .filter_map(|assignment| {
                roles
                    .iter()
                    .find(|role| role.id() == assignment.role_id())
                    .map(|role| UserRoleBinding {
                        assignment: assignment.clone(),
                        role: role.clone(),
                    })
            })
            .collect())
    }

    async fn delete_assignments(&self, user_id: UserId, role_id: RoleId) -> AppResult<u64> {
        let mut assignments = self.assignments.lock().await;
        let before = assignments.len();
        assignments.retain(|assignment| {
            !(assignment.user_id() == user_id && assignment.role_id() == role_id)
        });

        Ok((before - assignments.len()) as u64)
    }
}

#[derive(Default)]
struct FakeAuditRecorder {
    entries: Mutex<Vec<NewAuditLogEntry>>,
}

#[async_trait]
impl AuditRecorder for FakeAuditRecorder {
    async fn append(&self, entry: NewAuditLogEntry) -> AppResult<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

fn permission_named(name: &str) -> Permission {
    match PermissionName::new(name) {
        Ok(parsed) => Permission::new(PermissionId::new(), parsed, None, true, Utc::now()),
        Err(error) => panic!("permission name parse failed: {error}"),
    }
}

fn role_with_permissions(name: &str, permissions: Vec<Permission>) -> Role {
    match Role::new(
        RoleId::new(),
        name,
        None,
        10,
        true,
        false,
        permissions,
        Utc::now(),
    ) {
        Ok(role) => role,
        Err(error) => panic!("role construction failed: {error}"),
    }
}

struct Harness {
    service: PermissionService,
    permission_repository: Arc<FakePermissionRepository>,
    role_repository: Arc<FakeRoleRepository>,
    role_service: RoleService,
    audit: Arc<FakeAuditRecorder>,
}

fn harness() -> Harness {
    let permission_repository = Arc::new(FakePermissionRepository::default());
    let role_repository = Arc::new(FakeRoleRepository::default());
    let audit = Arc::new(FakeAuditRecorder::default());
    let role_service = RoleService::new(role_repository.clone(), audit.clone());
    let service = PermissionService::new(
        permission_repository.clone(),
        role_service.clone(),
        audit.clone(),
    );

    Harness {
        service,
        permission_repository,
        role_repository,
        role_service,
        audit,
    }
}

#[tokio::test]
async fn registering_the_same_name_twice_conflicts() {
    let harness = harness();
    let context = ActorContext::default();

    let first = harness
        .service
        .register(
            &context,
            NewPermissionInput {
                name: "posts:write".to_owned(),
                description: None,
            },
        )
        .await;
    assert!(first.is_ok());

    let second = harness
        .service
        .register(
            &context,
            NewPermissionInput {
                name: "posts:write".to_owned(),
                description: Some("duplicate".to_owned()),
            },
        )
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn register_rejects_malformed_name() {
    let harness = harness();

    let result = harness
        .service
        .register(
            &ActorContext::default(),
            NewPermissionInput {
                name: "posts".to_owned(),
                description: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn double_grant_is_idempotent() {
    let harness = harness();
    let context = ActorContext::default();

    let role = role_with_permissions("editor", Vec::new());
    harness.role_repository.roles.lock().await.push(role.clone());

    let permission = permission_named("posts:write");
    harness
        .permission_repository
        .permissions
        .lock()
        .await
        .push(permission.clone());

    let first = harness
        .service
        .grant_to_role(&context, role.id(), permission.id())
        .await;
    assert!(first.is_ok());

    let second = harness
        .service
        .grant_to_role(&context, role.id(), permission.id())
        .await;
    assert!(second.is_ok());

    let grants = harness.permission_repository.grants.lock().await;
    assert_eq!(grants.get(&role.id()).map(HashSet::len), Some(1));
}

#[tokio::test]
async fn grant_to_missing_role_is_not_found() {
    let harness = harness();

    let permission = permission_named("posts:write");
    harness
        .permission_repository
        .permissions
        .lock()
        .await
        .push(permission.clone());

    let result = harness
        .service
        .grant_to_role(&ActorContext::default(), RoleId::new(), permission.id())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn grant_of_missing_permission_is_not_found() {
    let harness = harness();

    let role = role_with_permissions("editor", Vec::new());
    harness.role_repository.roles.lock().await.push(role.clone());

    let result = harness
        .service
        .grant_to_role(&ActorContext::default(), role.id(), PermissionId::new())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn has_permission_sees_grants_of_active_roles() {
    let harness = harness();
    let context = ActorContext::default();

    let permission = permission_named("posts:write");
    let role = role_with_permissions("editor", vec![permission.clone()]);
    harness.role_repository.roles.lock().await.push(role.clone());

    let user_id = UserId::new();
    let assigned = harness
        .role_service
        .assign_to_user(
            &context,
            user_id,
            AssignRoleInput {
                role_id: role.id(),
                expires_at: None,
                assigned_by: None,
            },
        )
        .await;
    assert!(assigned.is_ok());

    let by_name = harness.service.has_permission(user_id, "posts:write").await;
    assert_eq!(by_name.ok(), Some(true));

    let by_pair = harness
        .service
        .has_resource_action(user_id, "posts", "write")
        .await;
    assert_eq!(by_pair.ok(), Some(true));

    let missing = harness.service.has_permission(user_id, "posts:delete").await;
    assert_eq!(missing.ok(), Some(false));
}

#[tokio::test]
async fn user_permissions_dedupe_by_permission_id() {
    let harness = harness();
    let context = ActorContext::default();

    // The same permission row reaches the user through two roles as two
    // structurally-equal clones.
    let shared = permission_named("posts:write");
    let extra = permission_named("posts:read");
    let editor = role_with_permissions("editor", vec![shared.clone(), extra.clone()]);
    let author = role_with_permissions("author", vec![shared.clone()]);
    harness.role_repository.roles.lock().await.push(editor.clone());
    harness.role_repository.roles.lock().await.push(author.clone());

    let user_id = UserId::new();
    for role_id in [editor.id(), author.id()] {
        let assigned = harness
            .role_service
            .assign_to_user(
                &context,
                user_id,
                AssignRoleInput {
                    role_id,
                    expires_at: None,
                    assigned_by: None,
                },
            )
            .await;
        assert!(assigned.is_ok());
    }

    let permissions = harness.service.user_permissions(user_id).await;
    let names: HashSet<String> = permissions
        .unwrap_or_default()
        .iter()
        .map(|permission| permission.name().as_str().to_owned())
        .collect();

    assert_eq!(names.len(), 2);
    assert!(names.contains("posts:write"));
    assert!(names.contains("posts:read"));
}

#[tokio::test]
async fn update_of_missing_permission_is_not_found() {
    let harness = harness();

    let result = harness
        .service
        .update(
            &ActorContext::default(),
            PermissionId::new(),
            PermissionUpdate::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_permission_and_audits() {
    let harness = harness();
    let context = ActorContext::default();

    let permission = permission_named("posts:write");
    harness
        .permission_repository
        .permissions
        .lock()
        .await
        .push(permission.clone());

    let deleted = harness.service.delete(&context, permission.id()).await;
    assert!(deleted.is_ok());

    let lookup = harness.service.find_by_name("posts:write").await;
    assert_eq!(lookup.ok().flatten(), None);

    assert_eq!(harness.audit.entries.lock().await.len(), 1);
}

#[tokio::test]
async fn delete_of_missing_permission_is_not_found() {
    let harness = harness();

    let result = harness
        .service
        .delete(&ActorContext::default(), PermissionId::new())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
