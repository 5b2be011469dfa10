//! Server settings
//!
//! Built-in defaults overlaid by `HOMESTAY_*` environment variables, e.g.
//! `HOMESTAY_PORT=8080` or `HOMESTAY_COMMISSION_PERCENT=10`.

use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::pricing::DEFAULT_COMMISSION_PERCENT;

pub const ENV_PREFIX: &str = "HOMESTAY";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS
    pub frontend_url: String,
    pub commission_percent: u32,
    /// ISO 4217 code used for gateway orders
    pub currency: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3001_i64)?
            .set_default("frontend_url", "http://localhost:5173")?
            .set_default("commission_percent", i64::from(DEFAULT_COMMISSION_PERCENT))?
            .set_default("currency", "INR")?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;
        app_config.currency = app_config.currency.to_uppercase();
        Ok(app_config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
