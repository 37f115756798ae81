//! Configuration loading from the process environment

use crate::core::error::ConfigError;
use std::fmt;

/// Environment variable holding the MongoDB connection string
pub const CONNECTION_STRING_VAR: &str = "MongoDBConnectionString";

/// Environment variable holding the database name
pub const DATABASE_NAME_VAR: &str = "MongoDBDatabaseName";

pub const HOST_VAR: &str = "HOST";
pub const PORT_VAR: &str = "PORT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Connection parameters for the document store
#[derive(Clone, PartialEq, Eq)]
pub struct MongoConfig {
    pub connection_string: String,
    pub database_name: String,
}

// Connection strings may embed credentials
impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("connection_string", &"<redacted>")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Address to bind, as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub mongo: MongoConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| get(name).ok_or_else(|| ConfigError::Missing(name.to_string()));

        let port = match get(PORT_VAR) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_VAR.to_string(),
                message: format!("{}: {}", raw, e),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            mongo: MongoConfig {
                connection_string: required(CONNECTION_STRING_VAR)?,
                database_name: required(DATABASE_NAME_VAR)?,
            },
            server: ServerConfig {
                host: get(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
        })
    }
}
