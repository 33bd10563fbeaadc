use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
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
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the SQLite database file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_connections() -> u32 {
    5
}

/// HMAC algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Symmetric signing key for access tokens; generated per process when unset
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub jwt_algorithm: JwtAlgorithm,
    /// Lifetime of issued access tokens (default: 30)
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    /// First admin account, created on startup when no users exist
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_algorithm: JwtAlgorithm::default(),
            token_ttl_minutes: default_token_ttl_minutes(),
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: None,
        }
    }
}

fn default_token_ttl_minutes() -> i64 {
    30
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@casework.local".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
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

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Login attempts allowed per IP within one window
    #[serde(default = "default_login_attempts_per_window")]
    pub login_attempts_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Seconds between sweeps of stale entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Key on X-Forwarded-For / X-Real-IP instead of the socket peer.
    /// Only enable behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            login_attempts_per_window: default_login_attempts_per_window(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
            trust_proxy_headers: false,
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_login_attempts_per_window() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(secret) = &self.auth.jwt_secret {
            if secret.len() < 16 {
                anyhow::bail!("auth.jwt_secret must be at least 16 characters");
            }
        }
        if self.auth.token_ttl_minutes <= 0 {
            anyhow::bail!("auth.token_ttl_minutes must be positive");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        if self.rate_limit.enabled {
            if self.rate_limit.window_seconds == 0 {
                anyhow::bail!("rate_limit.window_seconds must be at least 1");
            }
            if self.rate_limit.login_attempts_per_window == 0 {
                anyhow::bail!("rate_limit.login_attempts_per_window must be at least 1");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert_eq!(config.auth.jwt_algorithm, JwtAlgorithm::HS256);
        assert!(config.cors.allows_any_origin());
        assert!(config.rate_limit.enabled);
        assert!(!config.rate_limit.trust_proxy_headers);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_parses_sections() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9100

            [auth]
            jwt_secret = "0123456789abcdef0123"
            jwt_algorithm = "HS512"
            token_ttl_minutes = 45
            admin_password = "bootstrap-pass"

            [cors]
            allowed_origins = ["https://intake.example.org"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.jwt_algorithm, JwtAlgorithm::HS512);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("0123456789abcdef0123"));
        assert_eq!(config.auth.token_ttl_minutes, 45);
        assert_eq!(config.auth.admin_password.as_deref(), Some("bootstrap-pass"));
        assert!(!config.cors.allows_any_origin());
    }

    #[test]
    fn test_rejects_short_secret_and_bad_ttl() {
        assert!(Config::from_toml("[auth]\njwt_secret = \"short\"").is_err());
        assert!(Config::from_toml(
            "[auth]\njwt_secret = \"0123456789abcdef0123\"\ntoken_ttl_minutes = 0"
        )
        .is_err());
    }

    #[test]
    fn test_rejects_degenerate_rate_limit_window() {
        assert!(Config::from_toml("[rate_limit]\nwindow_seconds = 0").is_err());
        assert!(Config::from_toml("[rate_limit]\nlogin_attempts_per_window = 0").is_err());

        let config = Config::from_toml(
            "[rate_limit]\nenabled = false\nwindow_seconds = 0\nlogin_attempts_per_window = 0",
        )
        .unwrap();
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        assert!(Config::from_toml("[auth]\njwt_algorithm = \"RS256\"").is_err());
    }
}
