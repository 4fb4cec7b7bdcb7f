use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use crate::auth::UserRegistry;
use crate::config::AppConfig;
use crate::services::matching::Matcher;

pub struct AppState {
    pub config: AppConfig,
    pub users: UserRegistry,
    pub matcher: Arc<Matcher>,
}
