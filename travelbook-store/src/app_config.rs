use serde::Deserialize;
use std::env;
use travelbook_core::BookingRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 { 5 }
fn default_run_migrations() -> bool { true }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `TRAVELBOOK__STORAGE__BACKEND=postgres`
            .add_source(config::Environment::with_prefix("TRAVELBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.database.is_none());
        assert_eq!(config.booking.max_seats_per_booking, None);
        assert_eq!(config.booking.id_attempts, 5);
    }

    #[test]
    fn test_postgres_config() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [storage]
            backend = "postgres"

            [database]
            url = "postgres://travelbook@localhost/travelbook"

            [booking]
            max_seats_per_booking = 4
            "#,
        )
        .unwrap();

        let database = config.database.unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(database.max_connections, 5);
        assert!(database.run_migrations);
        assert_eq!(config.booking.max_seats_per_booking, Some(4));
        assert_eq!(config.booking.event_channel_capacity, 100);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = parse(
            r#"
            [server]
            port = 3000

            [storage]
            backend = "sqlite"
            "#,
        );
        assert!(result.is_err());
    }
}
