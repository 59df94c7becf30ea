use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let backend = BackendConfig::from_env()?;
        if environment == AppEnvironment::Production && backend.project.is_none() {
            return Err(ConfigError::MissingBackendUrl);
        }
        let admin_api_key = non_empty_var("ADMIN_API_KEY");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            dashboard: DashboardConfig { admin_api_key },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection details for the hosted backend. `project` is `None` when no
/// backend URL is configured, in which case callers fall back to a local store.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub project: Option<BackendProject>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct BackendProject {
    pub url: String,
    pub api_key: String,
}

impl fmt::Debug for BackendProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendProject")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = match non_empty_var("BACKEND_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            None => DEFAULT_BACKEND_TIMEOUT_SECS,
        };

        let project = match non_empty_var("SUPABASE_URL") {
            Some(url) => {
                let api_key =
                    non_empty_var("SUPABASE_ANON_KEY").ok_or(ConfigError::MissingBackendKey)?;
                Some(BackendProject {
                    url: url.trim_end_matches('/').to_string(),
                    api_key,
                })
            }
            None => None,
        };

        Ok(Self {
            project,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Access control for the admin dashboard routes.
#[derive(Clone, Default)]
pub struct DashboardConfig {
    pub admin_api_key: Option<String>,
}

impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    MissingBackendKey,
    MissingBackendUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "BACKEND_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::MissingBackendKey => {
                write!(f, "SUPABASE_ANON_KEY is required when SUPABASE_URL is set")
            }
            ConfigError::MissingBackendUrl => {
                write!(f, "SUPABASE_URL is required when APP_ENV is production")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::MissingBackendKey
            | ConfigError::MissingBackendUrl => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SUPABASE_URL",
            "SUPABASE_ANON_KEY",
            "BACKEND_TIMEOUT_SECS",
            "ADMIN_API_KEY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.backend.project.is_none());
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert!(config.dashboard.admin_api_key.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn backend_url_requires_api_key() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SUPABASE_URL", "https://project.supabase.co");
        let err = AppConfig::load().expect_err("missing key rejected");
        assert!(matches!(err, ConfigError::MissingBackendKey));

        env::set_var("SUPABASE_ANON_KEY", "anon-key");
        let config = AppConfig::load().expect("config loads");
        let project = config.backend.project.expect("project configured");
        assert_eq!(project.url, "https://project.supabase.co");
        assert_eq!(project.api_key, "anon-key");
        reset_env();
    }

    #[test]
    fn rejects_zero_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BACKEND_TIMEOUT_SECS", "0");
        let err = AppConfig::load().expect_err("zero timeout rejected");
        assert!(matches!(err, ConfigError::InvalidTimeout));
        reset_env();
    }

    #[test]
    fn production_requires_hosted_backend() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let err = AppConfig::load().expect_err("in-memory store refused in production");
        assert!(matches!(err, ConfigError::MissingBackendUrl));

        env::set_var("SUPABASE_URL", "https://project.supabase.co");
        env::set_var("SUPABASE_ANON_KEY", "anon-key");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(config.backend.project.is_some());
        reset_env();
    }

    #[test]
    fn development_may_run_without_backend() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "test");
        let config = AppConfig::load().expect("config loads");
        assert!(config.backend.project.is_none());
        reset_env();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let project = BackendProject {
            url: "https://project.supabase.co".to_string(),
            api_key: "super-secret".to_string(),
        };
        let rendered = format!("{project:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
