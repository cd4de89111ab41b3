//! Layered configuration
//!
//! Built-in defaults, then `config/default.*`, then `config/local.*`, then
//! `APP_` environment variables with `__` between nested keys
//! (`APP_JWT__SECRET`, `APP_STRIPE__WEBHOOK_SECRET`, ...).

use std::path::Path;

use auth::{JwtConfig, bootstrap::AdminConfig};
use common::database::DatabaseConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{payment::StripeConfig, pricing::PricingConfig, storage::UploadConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS
    pub cors_origin: String,
    pub environment: String,
    /// Proxies (addresses or CIDR networks) whose `X-Forwarded-For` and
    /// `X-Real-IP` headers are believed. Empty means the socket peer is used.
    pub trusted_proxies: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "http://localhost:3000".to_string(),
            environment: "development".to_string(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub pricing: PricingConfig,
    pub uploads: UploadConfig,
    pub admin: AdminConfig,
}

impl Settings {
    /// Load from `./config` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if settings.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "jwt.secret must be set (APP_JWT__SECRET)".to_string(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    fn clear(keys: &[&str]) {
        for key in keys {
            unsafe { std::env::remove_var(key) };
        }
    }

    fn empty_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("portfolio-config-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        let keys = [
            "APP_JWT__SECRET",
            "APP_SERVER__PORT",
            "APP_STRIPE__MAX_RETRIES",
            "APP_STRIPE__PRICE_IDS__PORTRAIT",
            "APP_DATABASE__URL",
        ];
        set("APP_JWT__SECRET", "test-secret");
        set("APP_SERVER__PORT", "9090");
        set("APP_STRIPE__MAX_RETRIES", "5");
        set("APP_STRIPE__PRICE_IDS__PORTRAIT", "price_portrait");
        set("APP_DATABASE__URL", "postgresql://db/test");

        let settings = Settings::load_from(&empty_dir());
        clear(&keys);
        let settings = settings.unwrap();

        assert_eq!(settings.jwt.secret, "test-secret");
        assert_eq!(settings.jwt.expires_in_secs, 86_400);
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.stripe.max_retries, 5);
        assert_eq!(settings.stripe.request_timeout_secs, 10);
        assert_eq!(settings.stripe.price_ids["portrait"], "price_portrait");
        assert_eq!(settings.database.url, "postgresql://db/test");
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.uploads.max_file_size, 50 * 1024 * 1024);
        assert_eq!(settings.admin.email, "admin@portfolio.com");
        assert!(settings.server.trusted_proxies.is_empty());
    }

    #[test]
    #[serial]
    fn test_trusted_proxies_from_environment() {
        let keys = ["APP_JWT__SECRET", "APP_SERVER__TRUSTED_PROXIES"];
        set("APP_JWT__SECRET", "test-secret");
        set("APP_SERVER__TRUSTED_PROXIES", "10.0.0.0/8,192.0.2.1");

        let settings = Settings::load_from(&empty_dir());
        clear(&keys);
        let settings = settings.unwrap();

        assert_eq!(
            settings.server.trusted_proxies,
            vec!["10.0.0.0/8".to_string(), "192.0.2.1".to_string()]
        );
    }

    #[test]
    #[serial]
    fn test_config_file_is_layered_under_environment() {
        let dir = empty_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[jwt]\nsecret = \"from-file\"\n\n[server]\nport = 7000\ncors_origin = \"https://portfolio.test\"\n\n[pricing.hourly_rates]\nwedding = 35000\n",
        )
        .unwrap();
        set("APP_SERVER__PORT", "7100");

        let settings = Settings::load_from(&dir);
        clear(&["APP_SERVER__PORT"]);
        let _ = std::fs::remove_dir_all(&dir);
        let settings = settings.unwrap();

        assert_eq!(settings.jwt.secret, "from-file");
        assert_eq!(settings.server.port, 7100);
        assert_eq!(settings.server.cors_origin, "https://portfolio.test");
        assert_eq!(settings.pricing.hourly_rates["wedding"], 35_000);
    }

    #[test]
    #[serial]
    fn test_missing_jwt_secret_is_rejected() {
        clear(&["APP_JWT__SECRET"]);
        assert!(Settings::load_from(&empty_dir()).is_err());
    }
}
