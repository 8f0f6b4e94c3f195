use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use workix_core::{AppError, AuthenticatedUser};

use crate::error::ApiResult;
use crate::state::AppState;

/// Role names a route group requires, attached as a layer extension.
///
/// Routes without this extension pass the guard unconditionally.
#[derive(Debug, Clone)]
pub struct RequiredRoles(Vec<String>);

impl RequiredRoles {
    /// Declares the roles required to reach a route group.
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        Self(names.iter().map(|name| (*name).to_owned()).collect())
    }

    /// Returns the declared role names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        self.0.as_slice()
    }
}

/// Denies the request unless the user holds one of the declared roles.
///
/// Re-queries role storage on every request; expired assignments drop out
/// without any cache invalidation.
pub async fn require_roles(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(required) = request.extensions().get::<RequiredRoles>().cloned() else {
        return Ok(next.run(request).await);
    };

    if required.names().is_empty() {
        return Ok(next.run(request).await);
    }

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let allowed = state
        .role_service
        .has_any_role(user.user_id(), required.names())
        .await?;

    if !allowed {
        return Err(AppError::Forbidden(format!(
            "user '{}' is missing required role(s): {}",
            user.user_id(),
            required.names().join(", ")
        ))
        .into());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::{from_fn, from_fn_with_state};
    use axum::routing::get;
    use tower::ServiceExt;
    use workix_application::{
        ActorContext, AssignRoleInput, AuditLogService, NewRoleInput, PermissionService,
        RoleService,
    };
    use workix_core::UserId;
    use workix_infrastructure::InMemoryRbacStore;

    use crate::middleware;
    use crate::state::AppState;

    use super::{RequiredRoles, require_roles};

    async fn probe() -> &'static str {
        "ok"
    }

    fn app_with_admin_probe() -> (Router, AppState) {
        let store = Arc::new(InMemoryRbacStore::new());
        let role_service = RoleService::new(store.clone(), store.clone());
        let state = AppState {
            role_service: role_service.clone(),
            permission_service: PermissionService::new(
                store.clone(),
                role_service,
                store.clone(),
            ),
            audit_log_service: AuditLogService::new(store),
        };

        let router = Router::new()
            .route("/probe", get(probe))
            .route_layer(from_fn_with_state(state.clone(), require_roles))
            .layer(axum::Extension(RequiredRoles::new(&["admin"])))
            .route_layer(from_fn(middleware::require_auth))
            .with_state(state.clone());

        (router, state)
    }

    async fn seed_admin_user(state: &AppState) -> UserId {
        let context = ActorContext::default();
        let admin = state
            .role_service
            .create(
                &context,
                NewRoleInput {
                    name: "admin".to_owned(),
                    description: None,
                    level: Some(1000),
                },
            )
            .await;
        let admin = match admin {
            Ok(role) => role,
            Err(error) => panic!("admin role creation failed: {error}"),
        };

        let user_id = UserId::new();
        let assigned = state
            .role_service
            .assign_to_user(
                &context,
                user_id,
                AssignRoleInput {
                    role_id: admin.id(),
                    expires_at: None,
                    assigned_by: None,
                },
            )
            .await;
        assert!(assigned.is_ok());

        user_id
    }

    fn request_as(user_id: Option<UserId>) -> Request<Body> {
        let builder = Request::builder().uri("/probe");
        let builder = match user_id {
            Some(user_id) => builder.header(middleware::USER_ID_HEADER, user_id.to_string()),
            None => builder,
        };

        match builder.body(Body::empty()) {
            Ok(request) => request,
            Err(error) => panic!("request construction failed: {error}"),
        }
    }

    #[tokio::test]
    async fn anonymous_request_is_unauthorized() {
        let (router, _) = app_with_admin_probe();

        let response = router.oneshot(request_as(None)).await;
        assert_eq!(
            response.ok().map(|response| response.status()),
            Some(StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn user_without_required_role_is_forbidden() {
        let (router, _) = app_with_admin_probe();

        let response = router.oneshot(request_as(Some(UserId::new()))).await;
        assert_eq!(
            response.ok().map(|response| response.status()),
            Some(StatusCode::FORBIDDEN)
        );
    }

    #[tokio::test]
    async fn user_with_required_role_passes() {
        let (router, state) = app_with_admin_probe();
        let admin_user = seed_admin_user(&state).await;

        let response = router.oneshot(request_as(Some(admin_user))).await;
        assert_eq!(
            response.ok().map(|response| response.status()),
            Some(StatusCode::OK)
        );
    }

    #[tokio::test]
    async fn route_without_declared_roles_passes_any_authenticated_user() {
        let store = Arc::new(InMemoryRbacStore::new());
        let role_service = RoleService::new(store.clone(), store.clone());
        let state = AppState {
            role_service: role_service.clone(),
            permission_service: PermissionService::new(
                store.clone(),
                role_service,
                store.clone(),
            ),
            audit_log_service: AuditLogService::new(store),
        };

        let router = Router::new()
            .route("/probe", get(probe))
            .route_layer(from_fn_with_state(state.clone(), require_roles))
            .route_layer(from_fn(middleware::require_auth))
            .with_state(state);

        let response = router.oneshot(request_as(Some(UserId::new()))).await;
        assert_eq!(
            response.ok().map(|response| response.status()),
            Some(StatusCode::OK)
        );
    }
}
