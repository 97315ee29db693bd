use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub limits: RequestLimits,
    pub rate_limit: RateLimitConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: AllowedOrigins,
}

#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub max_body_bytes: usize,
}

/// One fixed-window ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    pub window: Duration,
    pub max: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub general: WindowLimit,
    pub credentials: WindowLimit,
    /// How often expired windows are dropped from the store
    pub purge_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    pub default_sort_field: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub admin_email: Option<String>,
    /// Hex-encoded SHA-256 of the admin password
    pub admin_password_sha256: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general: WindowLimit {
                window: Duration::from_millis(900_000),
                max: 1000,
            },
            credentials: WindowLimit {
                window: Duration::from_millis(60_000),
                max: 5,
            },
            purge_interval: Duration::from_secs(60),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            default_sort_field: "createdAt".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            limits: RequestLimits::default(),
            rate_limit: RateLimitConfig::default(),
            pagination: PaginationConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let general_window_ms: u64 = parse_or(
            &lookup,
            "RATE_LIMIT_WINDOW_MS",
            defaults.rate_limit.general.window.as_millis() as u64,
        )?;
        let credential_window_ms: u64 = parse_or(
            &lookup,
            "AUTH_RATE_LIMIT_WINDOW_MS",
            defaults.rate_limit.credentials.window.as_millis() as u64,
        )?;

        Ok(Config {
            server: ServerConfig {
                host: lookup("API_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "API_PORT", defaults.server.port)?,
            },
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|raw| parse_origins(&raw))
                    .unwrap_or(AllowedOrigins::Any),
            },
            limits: RequestLimits {
                max_body_bytes: parse_or(
                    &lookup,
                    "MAX_BODY_BYTES",
                    defaults.limits.max_body_bytes,
                )?,
            },
            rate_limit: RateLimitConfig {
                general: WindowLimit {
                    window: Duration::from_millis(general_window_ms),
                    max: parse_or(&lookup, "RATE_LIMIT_MAX", defaults.rate_limit.general.max)?,
                },
                credentials: WindowLimit {
                    window: Duration::from_millis(credential_window_ms),
                    max: parse_or(
                        &lookup,
                        "AUTH_RATE_LIMIT_MAX",
                        defaults.rate_limit.credentials.max,
                    )?,
                },
                purge_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "RATE_LIMIT_PURGE_INTERVAL_SECONDS",
                    defaults.rate_limit.purge_interval.as_secs(),
                )?),
            },
            pagination: PaginationConfig {
                default_limit: parse_or(
                    &lookup,
                    "PAGINATION_DEFAULT_LIMIT",
                    defaults.pagination.default_limit,
                )?,
                max_limit: parse_or(
                    &lookup,
                    "PAGINATION_MAX_LIMIT",
                    defaults.pagination.max_limit,
                )?,
                default_sort_field: lookup("PAGINATION_DEFAULT_SORT")
                    .unwrap_or(defaults.pagination.default_sort_field),
            },
            auth: AuthConfig {
                admin_email: lookup("AUTH_ADMIN_EMAIL").filter(|v| !v.is_empty()),
                admin_password_sha256: lookup("AUTH_ADMIN_PASSWORD_SHA256")
                    .filter(|v| !v.is_empty()),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        _ => Ok(default),
    }
}

fn parse_origins(raw: &str) -> AllowedOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowedOrigins::Any
    } else {
        AllowedOrigins::List(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.cors.allowed_origins, AllowedOrigins::Any);
        assert_eq!(config.limits.max_body_bytes, 1_048_576);
        assert_eq!(
            config.rate_limit.general,
            WindowLimit {
                window: Duration::from_millis(900_000),
                max: 1000
            }
        );
        assert_eq!(
            config.rate_limit.credentials,
            WindowLimit {
                window: Duration::from_millis(60_000),
                max: 5
            }
        );
        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.max_limit, 100);
        assert_eq!(config.pagination.default_sort_field, "createdAt");
        assert!(config.auth.admin_email.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("AUTH_RATE_LIMIT_MAX", "3"),
            ("PAGINATION_MAX_LIMIT", "50"),
        ])
        .unwrap();

        assert_eq!(config.server_address(), "127.0.0.1:3000");
        assert_eq!(
            config.cors.allowed_origins,
            AllowedOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        assert_eq!(config.rate_limit.credentials.max, 3);
        assert_eq!(config.pagination.max_limit, 50);
    }

    #[test]
    fn test_wildcard_and_blank_values() {
        let config = from_pairs(&[("CORS_ALLOWED_ORIGINS", "https://a.example,*"), ("API_PORT", " ")])
            .unwrap();
        assert_eq!(config.cors.allowed_origins, AllowedOrigins::Any);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = from_pairs(&[("RATE_LIMIT_MAX", "lots")]).unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_MAX"));
    }
}
