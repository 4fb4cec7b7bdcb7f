use std::sync::Arc;

use axum::extract::State;
use axum::Extension;
use axum::Json;

use crate::auth::AuthUser;
use crate::models::{BalanceMap, UserProfile};
use crate::utils::response::AppError;
use crate::AppState;

pub async fn me(
    Extension(auth): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .users
        .get(auth.id)
        .await
        .map_err(|_| AppError::internal("user lookup failed"))?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(user.into()))
}

pub async fn balance(Extension(auth): Extension<AuthUser>, State(state): State<Arc<AppState>>) -> Json<BalanceMap> {
    Json(state.matcher.all_balances(auth.id))
}
