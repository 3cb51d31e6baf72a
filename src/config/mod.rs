use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "RATEBOOK_JWT_SECRET";

/// Environment variable that overrides `auth.admin_password`
pub const ADMIN_PASSWORD_ENV: &str = "RATEBOOK_ADMIN_PASSWORD";

/// Longest accepted access-token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Insert a demo user and sample businesses on startup
    #[serde(default)]
    pub seed_demo_data: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            seed_demo_data: false,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/ratebook.db")
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens. Generated at startup when empty.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Lifetime of an access token in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Password for the bootstrap admin. No admin is created when unset.
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            admin_email: default_admin_email(),
            admin_password: None,
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Any origin is allowed when empty.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        let ttl = self.auth.token_ttl_hours;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl) {
            bail!(
                "auth.token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                ttl
            );
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                self.auth.jwt_secret = Some(secret);
            }
        }
        if let Ok(password) = std::env::var(ADMIN_PASSWORD_ENV) {
            if !password.is_empty() {
                self.auth.admin_password = Some(password);
            }
        }
    }

    /// Returns the configured JWT secret, or a random one when none is set.
    pub fn jwt_secret(&self) -> String {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                warn!(
                    "No JWT secret configured; generated a random one. Tokens will not survive a restart (set {})",
                    JWT_SECRET_ENV
                );
                crate::crypto::generate_secret()
            }
        }
    }
}
