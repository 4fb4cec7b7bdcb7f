use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::api::handlers::{admin, orders, public, users};
use crate::auth::{auth_middleware, require_admin};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/public/register", post(public::register))
        .route("/public/register-admin", post(public::register_admin))
        .route("/public/instrument", get(public::list_instruments))
        .route("/public/orderbook/:ticker", get(public::orderbook))
        .route("/public/transactions/:ticker", get(public::transactions));

    let user_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/balance", get(users::balance))
        .route("/order", post(orders::place).get(orders::list))
        .route("/order/:id", get(orders::get).delete(orders::cancel))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/admin/instrument", post(admin::add_instrument))
        .route("/admin/instrument/:ticker", delete(admin::delete_instrument))
        .route("/admin/user/:id", delete(admin::delete_user))
        .route("/admin/balance/deposit", post(admin::deposit))
        .route("/admin/balance/withdraw", post(admin::withdraw))
        .layer(axum_middleware::from_fn(require_admin))
        .layer(axum_middleware::from_fn_with_state(state, auth_middleware));

    public_routes.merge(user_routes).merge(admin_routes)
}
