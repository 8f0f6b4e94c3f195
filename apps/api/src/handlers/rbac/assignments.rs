use super::*;

use workix_application::AssignRoleInput;
use workix_domain::RoleId;

pub async fn list_user_roles_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_service
        .user_roles(UserId::from_uuid(user_id))
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignmentResponse>)> {
    let role_id = Uuid::parse_str(payload.role_id.as_str())
        .map(RoleId::from_uuid)
        .map_err(|error| {
            AppError::Validation(format!("invalid role id '{}': {error}", payload.role_id))
        })?;
    let expires_at = payload
        .expires_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;
    let assigned_by = match payload.assigned_by.as_deref() {
        Some(value) => Some(parse_user_id(value)?),
        None => context.actor,
    };

    let assignment = state
        .role_service
        .assign_to_user(
            &context,
            UserId::from_uuid(user_id),
            AssignRoleInput {
                role_id,
                expires_at,
                assigned_by,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleAssignmentResponse::from(assignment)),
    ))
}

pub async fn remove_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .role_service
        .remove_from_user(
            &context,
            UserId::from_uuid(user_id),
            RoleId::from_uuid(role_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_service
        .user_permissions(UserId::from_uuid(user_id))
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn user_max_level_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserMaxLevelResponse>> {
    let max_level = state
        .role_service
        .user_max_level(UserId::from_uuid(user_id))
        .await?;

    Ok(Json(UserMaxLevelResponse { max_level }))
}

pub async fn my_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_service
        .user_roles(user.user_id())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_service
        .user_permissions(user.user_id())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}
