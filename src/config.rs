use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,

    // External place search service (Google Places-compatible text search)
    pub places_api_url: Option<String>,
    pub places_api_key: Option<Secret<String>>,

    // Seconds before a place-search request is abandoned
    pub places_timeout_secs: Option<u64>,

    // Security
    pub session_secret: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            places_api_url: config.get("places_api_url").ok(),
            places_api_key: config
                .get::<String>("places_api_key")
                .ok()
                .map(Secret::new),

            places_timeout_secs: config.get("places_timeout_secs").ok(),

            session_secret: Secret::new(config.get("session_secret")?),
        })
    }
}
