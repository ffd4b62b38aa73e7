use std::env;

use crate::services::forecast::ForecastSettings;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub forecast: ForecastSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = ForecastSettings::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BACKEND_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "https://localhost:5173".to_string()),
            forecast: ForecastSettings {
                annual_fee_ratio: env::var("FORECAST_ANNUAL_FEE_RATIO")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.annual_fee_ratio),
                fallback_fee: env::var("FORECAST_FALLBACK_FEE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.fallback_fee),
                ..defaults
            },
        })
    }
}
