use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use fleetport_api::http::HttpServerConfig;
use fleetport_postgres::PostgresConfig;
use fleetport_remote::RemotePlatformConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // HTTP server
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // PostgreSQL
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,
    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    /// Run goose migrations at startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,
    #[serde(default = "default_goose_binary_path")]
    pub goose_binary_path: String,

    // Remote device platform
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,
    #[serde(default)]
    pub remote_username: String,
    #[serde(default)]
    pub remote_password: String,
    #[serde(default = "default_remote_device_profile_id")]
    pub remote_device_profile_id: String,
    #[serde(default = "default_remote_request_timeout_secs")]
    pub remote_request_timeout_secs: u64,
    #[serde(default = "default_remote_token_ttl_secs")]
    pub remote_token_ttl_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Environment::default())
            .build()?;
        config.try_deserialize()
    }

    pub fn http(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.http_host.clone(),
            port: self.http_port,
        }
    }

    pub fn postgres(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            migrations_dir: self.migrations_dir.clone(),
            goose_binary_path: self.goose_binary_path.clone(),
        }
    }

    pub fn remote_platform(&self) -> RemotePlatformConfig {
        RemotePlatformConfig {
            base_url: self.remote_base_url.clone(),
            username: self.remote_username.clone(),
            password: self.remote_password.clone(),
            device_profile_id: self.remote_device_profile_id.clone(),
            request_timeout_secs: self.remote_request_timeout_secs,
            token_ttl_secs: self.remote_token_ttl_secs,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "fleetport".to_string()
}

fn default_postgres_username() -> String {
    "fleetport".to_string()
}

fn default_postgres_password() -> String {
    "fleetport".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_run_migrations() -> bool {
    true
}

fn default_migrations_dir() -> String {
    "crates/fleetport-postgres/migrations".to_string()
}

fn default_goose_binary_path() -> String {
    "goose".to_string()
}

fn default_remote_base_url() -> String {
    "https://dashboard.senselive.io".to_string()
}

fn default_remote_device_profile_id() -> String {
    "1b5e3410-50fa-11f0-9c46-b702b4c0da00".to_string()
}

fn default_remote_request_timeout_secs() -> u64 {
    15
}

fn default_remote_token_ttl_secs() -> u64 {
    900
}
