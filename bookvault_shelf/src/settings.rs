use anyhow::{bail, Context};
use serde::Deserialize;

/// Process configuration, read once at startup from the environment
/// (TOKEN_SECRET, PORT, USE_IN_MEMORY_DB, DB_HOST, DB_USERNAME, DB_PASSWORD,
/// CATALOG_URL). Everything except TOKEN_SECRET has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub token_secret: String,
    pub port: u16,
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
    pub catalog_url: String,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .set_default("port", 3001)?
            .set_default("use_in_memory_db", false)?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("catalog_url", "https://www.googleapis.com/books/v1")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("Failed to read configuration from environment")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration, TOKEN_SECRET must be set")?;

        // A server that cannot verify the tokens it issued must not come up
        if settings.token_secret.trim().is_empty() {
            bail!("TOKEN_SECRET must not be empty");
        }

        Ok(settings)
    }
}
