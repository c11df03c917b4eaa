use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTEN_PORT: u16 = 29002;
pub const DEFAULT_COOKIE_NAME: &str = "test_app";
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 15 * 60;
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_CLIENT_NAME: &str = "Test Webauthz Application";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// `production` turns on the Secure cookie flag
    pub env: String,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub webauthz: WebauthzSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub endpoint_url: Option<String>,
    /// No timeout when unset
    pub upstream_timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_seconds: i64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebauthzSettings {
    pub client_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            server: ServerConfig {
                listen_port: DEFAULT_LISTEN_PORT,
                endpoint_url: None,
                upstream_timeout_seconds: None,
            },
            session: SessionConfig {
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
                cleanup_interval_seconds: DEFAULT_CLEANUP_INTERVAL_SECONDS,
            },
            webauthz: WebauthzSettings {
                client_name: DEFAULT_CLIENT_NAME.to_string(),
            },
        }
    }
}

impl Settings {
    /// Defaults, then `config/default.toml`, then `APP_*` variables
    /// (e.g. `APP_SESSION__TTL_SECONDS`), then `LISTEN_PORT` / `ENDPOINT_URL`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("env", "development")?
            .set_default("server.listen_port", i64::from(DEFAULT_LISTEN_PORT))?
            .set_default("session.cookie_name", DEFAULT_COOKIE_NAME)?
            .set_default("session.ttl_seconds", DEFAULT_SESSION_TTL_SECONDS)?
            .set_default("session.cleanup_interval_seconds", DEFAULT_CLEANUP_INTERVAL_SECONDS as i64)?
            .set_default("webauthz.client_name", DEFAULT_CLIENT_NAME)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.listen_port", std::env::var("LISTEN_PORT").ok())?
            .set_override_option("server.endpoint_url", std::env::var("ENDPOINT_URL").ok())?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }

    /// Public base URL, derived from the port when not configured.
    pub fn endpoint_url(&self) -> String {
        match &self.server.endpoint_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{}", self.server.listen_port),
        }
    }

    pub fn grant_redirect_uri(&self) -> String {
        format!("{}/webauthz/grant", self.endpoint_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_derived_from_port() {
        let mut settings = Settings::default();
        assert_eq!(settings.endpoint_url(), "http://localhost:29002");

        settings.server.listen_port = 8080;
        assert_eq!(settings.grant_redirect_uri(), "http://localhost:8080/webauthz/grant");
    }

    #[test]
    fn test_explicit_endpoint_url() {
        let mut settings = Settings::default();
        settings.server.endpoint_url = Some("https://app.example.com/".to_string());
        assert_eq!(settings.grant_redirect_uri(), "https://app.example.com/webauthz/grant");
    }

    #[test]
    fn test_production_switch() {
        let mut settings = Settings::default();
        assert!(!settings.is_production());
        settings.env = "production".to_string();
        assert!(settings.is_production());
    }
}
