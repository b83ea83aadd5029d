use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::sqlite::SqliteConnectOptions;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub questions_per_page: i64,
    /// When set, logical error codes are also used as the HTTP status.
    /// Off by default: the web client reads `success`/`error` from the body
    /// and expects 200 everywhere.
    pub mirror_status_codes: bool,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub path: String,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .foreign_keys(true)
    }
}

/// Reads `.env`, then the optional config file (`TRIVIA_CONFIG`, defaults to
/// `configuration.{yaml,toml,json}`), then `APP_*` environment variables.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    dotenv::dotenv().ok();
    let file = dotenv::var("TRIVIA_CONFIG").unwrap_or_else(|_| "configuration".to_owned());
    build_configuration(&file)
}

pub fn build_configuration(file: &str) -> Result<Settings, ConfigError> {
    Config::builder()
        .set_default("application.host", "0.0.0.0")?
        .set_default("application.port", 8080)?
        .set_default("application.questions_per_page", 10)?
        .set_default("application.mirror_status_codes", false)?
        .set_default("database.path", "trivia.db")?
        .add_source(File::with_name(file).required(false))
        // e.g. APP_APPLICATION__PORT=5001 sets `application.port`
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
