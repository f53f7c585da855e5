//! Runtime configuration read from the environment.

use serde::Deserialize;

/// Connection settings for the Postgres connector.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    /// Read `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS` from the process
    /// environment, loading a `.env` file first when one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/rowmap".into());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_max_connections);
        DatabaseConfig {
            url,
            max_connections,
        }
    }
}
