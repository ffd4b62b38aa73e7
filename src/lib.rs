pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use services::fetcher::RowSource;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RowSource>,
    pub config: config::AppConfig,
}
