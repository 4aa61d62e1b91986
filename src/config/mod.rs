//! Configuration module for the catalog client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Production API used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api-teste-front-production.up.railway.app";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base address of the catalog REST API
    pub api_base_url: String,
    /// Path segment of the register endpoint
    pub register_path: String,
    /// Path segment of the login endpoint
    pub login_path: String,
    /// File holding the persisted auth blob
    pub auth_storage_path: PathBuf,
    /// Page size used when the caller does not pick one
    pub default_page_size: u32,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("CATALOG_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let register_path = env::var("CATALOG_AUTH_REGISTER_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "/users".to_string());

        let login_path = env::var("CATALOG_AUTH_LOGIN_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "/auth/login".to_string());

        let auth_storage_path = env::var("CATALOG_AUTH_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/auth.json".to_string())
            .into();

        let default_page_size = match env::var("CATALOG_PAGE_SIZE") {
            Ok(raw) => match raw.parse::<u32>() {
                Ok(size) if (1..=100).contains(&size) => size,
                _ => {
                    tracing::warn!("Ignoring invalid CATALOG_PAGE_SIZE {:?}", raw);
                    10
                }
            },
            Err(_) => 10,
        };

        let log_level = env::var("CATALOG_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

        let log_json = env::var("CATALOG_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            api_base_url,
            register_path,
            login_path,
            auth_storage_path,
            default_page_size,
            log_level,
            log_json,
        }
    }

    /// Configuration pointing at an arbitrary base URL, everything else default.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            register_path: "/users".to_string(),
            login_path: "/auth/login".to_string(),
            auth_storage_path: PathBuf::from("./data/auth.json"),
            default_page_size: 10,
            log_level: "warn".to_string(),
            log_json: false,
        }
    }
}
