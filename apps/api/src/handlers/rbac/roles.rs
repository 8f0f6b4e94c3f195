use super::*;

use workix_application::{NewRoleInput, RoleUpdate};
use workix_domain::RoleId;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_service
        .find_all(query.include_inactive.unwrap_or(false))
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_service
        .create(
            &context,
            NewRoleInput {
                name: payload.name,
                description: payload.description,
                level: payload.level,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_service
        .find_by_id(RoleId::from_uuid(role_id))
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_service
        .update(
            &context,
            RoleId::from_uuid(role_id),
            RoleUpdate {
                name: payload.name,
                description: payload.description,
                level: payload.level,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .role_service
        .delete(&context, RoleId::from_uuid(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
