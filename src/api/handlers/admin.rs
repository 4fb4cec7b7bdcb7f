use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::models::{BalanceAdjustRequest, CreateInstrumentRequest, InstrumentResponse};
use crate::utils::response::AppError;
use crate::AppState;

pub async fn add_instrument(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInstrumentRequest>,
) -> Result<Json<InstrumentResponse>, AppError> {
    if req.ticker.trim().is_empty() {
        return Err(AppError::bad_request("ticker must not be empty"));
    }
    let instrument = state.matcher.add_instrument(&req.ticker, &req.name)?;
    Ok(Json(instrument.into()))
}

pub async fn delete_instrument(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<StatusCode, AppError> {
    state.matcher.delete_instrument(&ticker)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.users.delete(id) {
        return Err(AppError::not_found("unknown user"));
    }
    state.matcher.delete_user_balances(id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BalanceAdjustRequest>,
) -> Result<StatusCode, AppError> {
    state.matcher.deposit(req.user_id, &req.ticker, req.amount)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BalanceAdjustRequest>,
) -> Result<StatusCode, AppError> {
    state.matcher.withdraw(req.user_id, &req.ticker, req.amount)?;
    Ok(StatusCode::NO_CONTENT)
}
