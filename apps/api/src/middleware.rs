use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;
use workix_application::ActorContext;
use workix_core::{AppError, AuthenticatedUser, UserId};

use crate::error::ApiResult;

/// Header carrying the verified user id, set by the platform gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the user display name.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the user email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Resolves the identity forwarded by the authenticating gateway.
///
/// Authentication happens upstream; this service only trusts the forwarded
/// headers and rejects requests that arrive without them.
pub async fn require_auth(mut request: Request, next: Next) -> ApiResult<Response> {
    let headers = request.headers();

    let raw_user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let user_id = Uuid::parse_str(raw_user_id)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Unauthorized("invalid user identity header".to_owned()))?;

    let display_name = headers
        .get(USER_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| user_id.to_string());
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let ip_address = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let context = ActorContext {
        actor: Some(user_id),
        ip_address,
        user_agent,
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::new(user_id, display_name, email));
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
