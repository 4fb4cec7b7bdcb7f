use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{OrderResponse, PlaceOrderRequest, Trade};
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub trades: Vec<Trade>,
}

pub async fn place(
    Extension(auth): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, AppError> {
    let outcome = state.matcher.place(auth.id, req).await?;
    let order = state.matcher.order(auth.id, outcome.order_id)?;
    Ok(Json(PlaceOrderResponse {
        order: order.into(),
        trades: outcome.trades,
    }))
}

pub async fn list(Extension(auth): Extension<AuthUser>, State(state): State<Arc<AppState>>) -> Json<Vec<OrderResponse>> {
    Json(state.matcher.list_orders(auth.id).into_iter().map(OrderResponse::from).collect())
}

pub async fn get(
    Extension(auth): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    Ok(Json(state.matcher.order(auth.id, id)?.into()))
}

pub async fn cancel(
    Extension(auth): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.matcher.cancel(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
