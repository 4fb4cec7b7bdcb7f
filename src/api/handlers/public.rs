use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::models::{InstrumentResponse, RegisterRequest, RegisterResponse, Role, Trade};
use crate::services::matching::BookSnapshot;
use crate::utils::response::AppError;
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let user = state.users.register(req.name, Role::User);
    Ok(Json(user.into()))
}

pub async fn register_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let user = state.users.register(req.name, Role::Admin);
    Ok(Json(user.into()))
}

pub async fn list_instruments(State(state): State<Arc<AppState>>) -> Json<Vec<InstrumentResponse>> {
    Json(
        state
            .matcher
            .list_instruments()
            .into_iter()
            .map(InstrumentResponse::from)
            .collect(),
    )
}

#[derive(serde::Deserialize)]
pub struct DepthQuery {
    limit: Option<usize>,
}

pub async fn orderbook(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(q): Query<DepthQuery>,
) -> Result<Json<BookSnapshot>, AppError> {
    let depth = q.limit.unwrap_or(10);
    Ok(Json(state.matcher.snapshot(&ticker, depth).await?))
}

#[derive(serde::Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Trade>> {
    Json(state.matcher.history(&ticker, q.limit.unwrap_or(10).min(100)))
}

/// Diagnostic endpoint, deliberately outside `/api/v1`: echoes the request
/// headers the server actually received, useful when a reverse proxy is
/// suspected of mangling the `Authorization` header.
pub async fn debug_headers(headers: HeaderMap) -> Json<HashMap<String, String>> {
    Json(
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<non-utf8>").to_string()))
            .collect(),
    )
}
