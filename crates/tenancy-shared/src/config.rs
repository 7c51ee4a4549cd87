//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub tenancy: TenancySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

/// Tenancy behavior knobs.
///
/// `scoping_required` is the default for the strict/lenient missing-tenant
/// policy inside a unit of work; it can still be overridden per scope.
#[derive(Debug, Deserialize, Clone)]
pub struct TenancySettings {
    pub scoping_required: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // .env first so APP_ENV and the env source below see it.
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "tenancy")?
            .set_default("database.url", "postgres://localhost/tenancy")?
            .set_default("database.max_connections", 10)?
            .set_default("tenancy.scoping_required", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}
