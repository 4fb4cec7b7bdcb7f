use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::models::Role;
use crate::utils::response::AppError;
use crate::AppState;

/// The authenticated caller, attached to request extensions once the
/// `Authorization: TOKEN <api-key>` header resolves to a known user.
#[derive(Clone)]
pub struct AuthUser {
    pub id: uuid::Uuid,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match header_value {
        Some(h) if h.starts_with("TOKEN ") => &h[6..],
        _ => return Err(AppError::unauthorized("missing or malformed Authorization header")),
    };

    let user = state
        .users
        .find_by_api_key(api_key)
        .await
        .map_err(|_| AppError::internal("user lookup failed"))?
        .ok_or_else(|| AppError::unauthorized("unknown api key"))?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Layered after `auth_middleware`; rejects callers who authenticated but
/// aren't an admin.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::internal("require_admin run before auth_middleware"))?;

    if user.role != Role::Admin {
        return Err(AppError::forbidden("admin role required"));
    }

    Ok(next.run(request).await)
}
