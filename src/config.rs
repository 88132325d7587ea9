use std::env;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DB_PATH: &str = "sheetchat.db";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models offered in the model selector.
pub const AVAILABLE_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"];

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server_url: String,
    pub db_path: String,
    pub default_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            server_url: non_empty("SHEETCHAT_SERVER_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            db_path: non_empty("SHEETCHAT_DB_PATH").unwrap_or(defaults.db_path),
            default_model: non_empty("SHEETCHAT_DEFAULT_MODEL").unwrap_or(defaults.default_model),
        }
    }
}
