//! Layered configuration: defaults in code, then `config/{env}.toml`,
//! then `TRADEBOOK__*` environment overrides.

use std::net::{IpAddr, SocketAddr};

use config::{ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Active environment name (development, production)
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret, must be set outside development
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,
}

impl ServerConfig {
    /// Bind address, falling back to all interfaces on a bad host string.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip: IpAddr = self
            .host
            .parse()
            .unwrap_or_else(|_| IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("TRADEBOOK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config: Config = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("TRADEBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Fail fast on settings that would only surface as runtime auth errors.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "jwt.secret must not be empty (set TRADEBOOK__JWT__SECRET)".into(),
            ));
        }
        if self.jwt.access_token_expiry <= 0 || self.jwt.refresh_token_expiry <= 0 {
            return Err(ConfigError::Message(
                "token expiries must be positive".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "database.min_connections exceeds max_connections".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "development".into(),
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/tradebook".into(),
                max_connections: 10,
                min_connections: 2,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                access_token_expiry: 3600,
                refresh_token_expiry: 604800,
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn blank_secret_rejected() {
        let mut config = base_config();
        config.jwt.secret = "   ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_pool_bounds_rejected() {
        let mut config = base_config();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_host_falls_back_to_unspecified() {
        let server = ServerConfig {
            host: "not-an-ip".into(),
            port: 8080,
        };
        let addr = server.socket_addr();
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8080);
    }
}
