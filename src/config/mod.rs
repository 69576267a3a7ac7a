use std::env;

use serde::Deserialize;

use crate::core::{AppError, Result};

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub razorpay: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

/// Razorpay credentials; `key_secret` signs the `{order_id}|{payment_id}`
/// callback signature and must never appear in logs or responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            razorpay: GatewayConfig {
                key_id: env::var("RAZORPAY_KEY_ID")
                    .map_err(|_| AppError::Configuration("RAZORPAY_KEY_ID not set".to_string()))?,
                key_secret: env::var("RAZORPAY_KEY_SECRET").map_err(|_| {
                    AppError::Configuration("RAZORPAY_KEY_SECRET not set".to_string())
                })?,
                base_url: env::var("RAZORPAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
                timeout_secs: env::var("RAZORPAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid RAZORPAY_TIMEOUT_SECS".to_string())
                    })?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.razorpay.key_id.trim().is_empty() || self.razorpay.key_secret.trim().is_empty() {
            return Err(AppError::Configuration(
                "Razorpay credentials must not be empty".to_string(),
            ));
        }

        if self.razorpay.timeout_secs == 0 {
            return Err(AppError::Configuration(
                "Gateway timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
