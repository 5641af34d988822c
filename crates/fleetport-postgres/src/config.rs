use serde::{Deserialize, Serialize};

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
    pub migrations_dir: String,
    pub goose_binary_path: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "fleetport".to_string(),
            username: "fleetport".to_string(),
            password: "fleetport".to_string(),
            max_pool_size: 10,
            migrations_dir: "crates/fleetport-postgres/migrations".to_string(),
            goose_binary_path: "goose".to_string(),
        }
    }
}

impl PostgresConfig {
    /// Goose-style DSN for the migration runner.
    pub fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}
