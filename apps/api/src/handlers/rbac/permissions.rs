use super::*;

use workix_application::{NewPermissionInput, PermissionUpdate};
use workix_domain::{PermissionId, PermissionName, RoleId};

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_service
        .find_all(query.include_inactive.unwrap_or(false))
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn register_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Json(payload): Json<RegisterPermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .permission_service
        .register(
            &context,
            NewPermissionInput {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

pub async fn resource_permissions_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_service
        .resource_permissions(resource.as_str())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path(permission_id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionRequest>,
) -> ApiResult<Json<PermissionResponse>> {
    let name = payload
        .name
        .map(PermissionName::new)
        .transpose()?;

    let permission = state
        .permission_service
        .update(
            &context,
            PermissionId::from_uuid(permission_id),
            PermissionUpdate {
                name,
                description: payload.description,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(PermissionResponse::from(permission)))
}

pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path(permission_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .delete(&context, PermissionId::from_uuid(permission_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .grant_to_role(
            &context,
            RoleId::from_uuid(role_id),
            PermissionId::from_uuid(permission_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .revoke_from_role(
            &context,
            RoleId::from_uuid(role_id),
            PermissionId::from_uuid(permission_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
