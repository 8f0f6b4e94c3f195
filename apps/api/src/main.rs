//! Workix RBAC API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod guard;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::{Extension, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use workix_application::{AuditLogService, PermissionService, RoleService};
use workix_core::AppError;
use workix_infrastructure::{
    PostgresAuditLogRepository, PostgresPermissionRepository, PostgresRoleRepository,
    ensure_builtin_roles,
};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let console_url =
        env::var("CONSOLE_URL").unwrap_or_else(|_| "http://localhost:4200".to_owned());
    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let permission_repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditLogRepository::new(pool.clone()));

    ensure_builtin_roles(role_repository.as_ref()).await?;

    let role_service = RoleService::new(role_repository, audit_repository.clone());
    let permission_service = PermissionService::new(
        permission_repository,
        role_service.clone(),
        audit_repository.clone(),
    );
    let audit_log_service = AuditLogService::new(audit_repository);

    let app_state = AppState {
        role_service,
        permission_service,
        audit_log_service,
    };

    // Administrative surface: declared required roles are resolved by the
    // shared guard middleware before any handler runs.
    let admin_routes = Router::new()
        .route(
            "/api/rbac/roles",
            get(handlers::rbac::list_roles_handler).post(handlers::rbac::create_role_handler),
        )
        .route(
            "/api/rbac/roles/{role_id}",
            get(handlers::rbac::get_role_handler)
                .put(handlers::rbac::update_role_handler)
                .delete(handlers::rbac::delete_role_handler),
        )
        .route(
            "/api/rbac/roles/{role_id}/permissions/{permission_id}",
            post(handlers::rbac::grant_permission_handler)
                .delete(handlers::rbac::revoke_permission_handler),
        )
        .route(
            "/api/rbac/permissions",
            get(handlers::rbac::list_permissions_handler)
                .post(handlers::rbac::register_permission_handler),
        )
        .route(
            "/api/rbac/permissions/{permission_id}",
            axum::routing::put(handlers::rbac::update_permission_handler)
                .delete(handlers::rbac::delete_permission_handler),
        )
        .route(
            "/api/rbac/resources/{resource}/permissions",
            get(handlers::rbac::resource_permissions_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/roles",
            get(handlers::rbac::list_user_roles_handler)
                .post(handlers::rbac::assign_role_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/roles/{role_id}",
            axum::routing::delete(handlers::rbac::remove_role_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/permissions",
            get(handlers::rbac::user_permissions_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/max-level",
            get(handlers::rbac::user_max_level_handler),
        )
        .route(
            "/api/audit-logs",
            get(handlers::rbac::list_audit_logs_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), guard::require_roles))
        .layer(Extension(guard::RequiredRoles::new(&["admin"])));

    // Self-service surface: the guard runs but no roles are declared.
    let me_routes = Router::new()
        .route("/api/rbac/me/roles", get(handlers::rbac::my_roles_handler))
        .route(
            "/api/rbac/me/permissions",
            get(handlers::rbac::my_permissions_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), guard::require_roles));

    let protected_routes = Router::new()
        .merge(admin_routes)
        .merge(me_routes)
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&console_url)
                .map_err(|error| AppError::Internal(format!("invalid CONSOLE_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "workix-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
