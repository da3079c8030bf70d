use std::env;

use thiserror::Error;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DATABASE_NAME: &str = "apartment_booking";
const JWT_TTL_DAYS: i64 = 7;
const CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings, read once at startup and shared with handlers as `web::Data<AppConfig>`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub stripe_secret_key: Option<String>,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value,
            })?,
            Err(_) => PORT,
        };

        let jwt_ttl_days = match env::var("JWT_TTL_DAYS") {
            Ok(value) => match value.parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "JWT_TTL_DAYS",
                        value,
                    })
                }
            },
            Err(_) => JWT_TTL_DAYS,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port,
            mongodb_uri: required("MONGODB_URI")?,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| DATABASE_NAME.to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_days,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| CORS_ORIGIN.to_string()),
        })
    }

    /// Settings for a local instance: no payments, local MongoDB.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: PORT,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: DATABASE_NAME.to_string(),
            jwt_secret: jwt_secret.into(),
            jwt_ttl_days: JWT_TTL_DAYS,
            stripe_secret_key: None,
            cors_origin: CORS_ORIGIN.to_string(),
        }
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}
