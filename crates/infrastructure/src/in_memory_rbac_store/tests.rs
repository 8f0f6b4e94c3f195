use std::sync::Arc;

use chrono::{Duration, Utc};

use workix_application::{
    ActorContext, AssignRoleInput, AuditLogFilters, AuditLogService, NewPermissionInput,
    NewRoleInput, PermissionService, RoleService, RoleUpdate,
};
use workix_core::{AppError, UserId};
use workix_domain::{AuditSortKey, Role, SortOrder};

use crate::bootstrap::ensure_builtin_roles;

use super::InMemoryRbacStore;

struct Harness {
    store: Arc<InMemoryRbacStore>,
    roles: RoleService,
    permissions: PermissionService,
    audit_log: AuditLogService,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryRbacStore::new());
    let roles = RoleService::new(store.clone(), store.clone());
    let permissions = PermissionService::new(store.clone(), roles.clone(), store.clone());
    let audit_log = AuditLogService::new(store.clone());

    Harness {
        store,
        roles,
        permissions,
        audit_log,
    }
}

async fn create_role(harness: &Harness, name: &str, level: u16) -> Role {
    let created = harness
        .roles
        .create(
            &ActorContext::default(),
            NewRoleInput {
                name: name.to_owned(),
                description: None,
                level: Some(level),
            },
        )
        .await;

    match created {
        Ok(role) => role,
        Err(error) => panic!("role creation failed: {error}"),
    }
}

#[tokio::test]
async fn editor_scenario_grants_and_expires() {
    let harness = harness();
    let context = ActorContext::default();

    let editor = create_role(&harness, "editor", 10).await;

    let permission = harness
        .permissions
        .register(
            &context,
            NewPermissionInput {
                name: "posts:write".to_owned(),
                description: None,
            },
        )
        .await;
    let permission = match permission {
        Ok(permission) => permission,
        Err(error) => panic!("permission registration failed: {error}"),
    };

    let granted = harness
        .permissions
        .grant_to_role(&context, editor.id(), permission.id())
        .await;
    assert!(granted.is_ok());

    let writer = UserId::new();
    let assigned = harness
        .roles
        .assign_to_user(
            &context,
            writer,
            AssignRoleInput {
                role_id: editor.id(),
                expires_at: None,
                assigned_by: None,
            },
        )
        .await;
    assert!(assigned.is_ok());

    let allowed = harness
        .permissions
        .has_permission(writer, "posts:write")
        .await;
    assert_eq!(allowed.ok(), Some(true));

    // A second user whose only grant expired an hour ago holds nothing.
    let expired_user = UserId::new();
    let expired = harness
        .roles
        .assign_to_user(
            &context,
            expired_user,
            AssignRoleInput {
                role_id: editor.id(),
                expires_at: Some(Utc::now() - Duration::hours(1)),
                assigned_by: None,
            },
        )
        .await;
    assert!(expired.is_ok());

    let has_role = harness.roles.has_role(expired_user, "editor").await;
    assert_eq!(has_role.ok(), Some(false));

    let allowed = harness
        .permissions
        .has_permission(expired_user, "posts:write")
        .await;
    assert_eq!(allowed.ok(), Some(false));
}

#[tokio::test]
async fn duplicate_role_name_conflicts_in_storage() {
    let harness = harness();

    create_role(&harness, "editor", 10).await;

    let second = harness
        .roles
        .create(
            &ActorContext::default(),
            NewRoleInput {
                name: "editor".to_owned(),
                description: None,
                level: Some(20),
            },
        )
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn builtin_admin_role_cannot_be_deleted() {
    let harness = harness();

    let seeded = ensure_builtin_roles(harness.store.as_ref()).await;
    assert!(seeded.is_ok());

    let admin = harness.roles.find_by_name("admin").await.ok().flatten();
    let admin = match admin {
        Some(role) => role,
        None => panic!("admin role missing after bootstrap"),
    };
    assert!(admin.is_system());
    assert_eq!(admin.level(), 1000);

    let deleted = harness
        .roles
        .delete(&ActorContext::default(), admin.id())
        .await;
    assert!(matches!(deleted, Err(AppError::Conflict(_))));

    let still_there = harness.roles.find_by_id(admin.id()).await;
    assert!(still_there.is_ok());

    let level_change = harness
        .roles
        .update(
            &ActorContext::default(),
            admin.id(),
            RoleUpdate {
                level: Some(1),
                ..RoleUpdate::default()
            },
        )
        .await;
    assert!(matches!(level_change, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let harness = harness();

    for _ in 0..2 {
        let seeded = ensure_builtin_roles(harness.store.as_ref()).await;
        assert!(seeded.is_ok());
    }

    let roles = harness.roles.find_all(true).await;
    assert_eq!(roles.ok().map(|roles| roles.len()), Some(2));
}

#[tokio::test]
async fn double_grant_leaves_permission_set_unchanged() {
    let harness = harness();
    let context = ActorContext::default();

    let editor = create_role(&harness, "editor", 10).await;
    let permission = harness
        .permissions
        .register(
            &context,
            NewPermissionInput {
                name: "posts:write".to_owned(),
                description: None,
            },
        )
        .await;
    let permission = match permission {
        Ok(permission) => permission,
        Err(error) => panic!("permission registration failed: {error}"),
    };

    for _ in 0..2 {
        let granted = harness
            .permissions
            .grant_to_role(&context, editor.id(), permission.id())
            .await;
        assert!(granted.is_ok());
    }

    let reloaded = harness.roles.find_by_id(editor.id()).await;
    assert_eq!(
        reloaded.ok().map(|role| role.permissions().len()),
        Some(1)
    );
}

#[tokio::test]
async fn second_open_ended_assignment_conflicts_in_storage() {
    let harness = harness();
    let context = ActorContext::default();

    let editor = create_role(&harness, "editor", 10).await;
    let user = UserId::new();

    let first = harness
        .roles
        .assign_to_user(
            &context,
            user,
            AssignRoleInput {
                role_id: editor.id(),
                expires_at: None,
                assigned_by: None,
            },
        )
        .await;
    assert!(first.is_ok());

    let second = harness
        .roles
        .assign_to_user(
            &context,
            user,
            AssignRoleInput {
                role_id: editor.id(),
                expires_at: None,
                assigned_by: None,
            },
        )
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn user_permissions_union_spans_roles_without_duplicates() {
    let harness = harness();
    let context = ActorContext::default();

    let editor = create_role(&harness, "editor", 10).await;
    let author = create_role(&harness, "author", 5).await;

    let shared = harness
        .permissions
        .register(
            &context,
            NewPermissionInput {
                name: "posts:write".to_owned(),
                description: None,
            },
        )
        .await;
    let extra = harness
        .permissions
        .register(
            &context,
            NewPermissionInput {
                name: "posts:read".to_owned(),
                description: None,
            },
        )
        .await;
    let (shared, extra) = match (shared, extra) {
        (Ok(shared), Ok(extra)) => (shared, extra),
        _ => panic!("permission registration failed"),
    };

    for role_id in [editor.id(), author.id()] {
        let granted = harness
            .permissions
            .grant_to_role(&context, role_id, shared.id())
            .await;
        assert!(granted.is_ok());
    }
    let granted = harness
        .permissions
        .grant_to_role(&context, editor.id(), extra.id())
        .await;
    assert!(granted.is_ok());

    let user = UserId::new();
    for role_id in [editor.id(), author.id()] {
        let assigned = harness
            .roles
            .assign_to_user(
                &context,
                user,
                AssignRoleInput {
                    role_id,
                    expires_at: None,
                    assigned_by: None,
                },
            )
            .await;
        assert!(assigned.is_ok());
    }

    let union = harness.permissions.user_permissions(user).await;
    assert_eq!(union.ok().map(|permissions| permissions.len()), Some(2));
}

#[tokio::test]
async fn mutations_land_in_the_audit_log() {
    let harness = harness();
    let actor = UserId::new();
    let context = ActorContext {
        actor: Some(actor),
        ip_address: Some("192.0.2.10".to_owned()),
        user_agent: Some("workix-console".to_owned()),
    };

    let editor = harness
        .roles
        .create(
            &context,
            NewRoleInput {
                name: "editor".to_owned(),
                description: None,
                level: Some(10),
            },
        )
        .await;
    assert!(editor.is_ok());

    let page = harness
        .audit_log
        .list(AuditLogFilters {
            action: Some("rbac.role.created".to_owned()),
            ..AuditLogFilters::default()
        })
        .await;
    assert!(page.is_ok());

    if let Ok(page) = page {
        assert_eq!(page.total, 1);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].user_id, Some(actor));
        assert_eq!(page.entries[0].entity_type, "role");
        assert_eq!(page.entries[0].ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(page.action_types, vec!["rbac.role.created".to_owned()]);
        assert_eq!(page.entity_types, vec!["role".to_owned()]);
    }
}

#[tokio::test]
async fn audit_listing_sorts_and_paginates() {
    let harness = harness();
    let context = ActorContext::default();

    for name in ["alpha", "bravo", "charlie"] {
        let created = harness
            .roles
            .create(
                &context,
                NewRoleInput {
                    name: name.to_owned(),
                    description: None,
                    level: Some(1),
                },
            )
            .await;
        assert!(created.is_ok());
    }

    let page = harness
        .audit_log
        .list(AuditLogFilters {
            sort_by: AuditSortKey::CreatedAt,
            sort_order: SortOrder::Asc,
            page: 2,
            limit: 2,
            ..AuditLogFilters::default()
        })
        .await;
    assert!(page.is_ok());

    if let Ok(page) = page {
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.entries.len(), 1);
    }
}
