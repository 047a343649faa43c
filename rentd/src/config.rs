//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` but can be specified
//! via the `-f` flag or the `RENTD_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in order (later sources override earlier ones):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `RENTD_`
//! 3. **DATABASE_URL** - special case: overrides `database_url` if set
//!
//! Nested values use double underscores in environment variables, e.g.
//! `RENTD_GATEWAY__PAYMONGO__SECRET_KEY=sk_test_...`.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RENTD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL of the customer-facing app (e.g., "https://app.example.com").
    /// Used for the gateway's post-checkout redirect URLs.
    pub app_url: String,
    /// PostgreSQL connection string. `DATABASE_URL` overrides this if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Secret key for verifying the identity provider's bearer tokens
    pub secret_key: Option<String>,
    /// Payment gateway configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            app_url: "http://localhost:8100".to_string(),
            database_url: None,
            secret_key: None,
            gateway: None,
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("RENTD_").split("__"))
            // Accept the conventional DATABASE_URL spelling as well
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .extract()?;

        Ok(config)
    }

    /// The address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The required database connection string
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database_url is not configured (set DATABASE_URL or database_url)"))
    }
}

/// Payment gateway configuration.
///
/// Credentials should be set via environment variables, e.g.
/// `RENTD_GATEWAY__PAYMONGO__SECRET_KEY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayConfig {
    /// PayMongo payment processing
    Paymongo(PaymongoConfig),
    /// Dummy gateway with scripted results, for testing and development
    Dummy(DummyGatewayConfig),
}

/// PayMongo gateway configuration.
///
/// Test/live mode is determined by the key prefix (`sk_test_` / `sk_live_`),
/// not by the API URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymongoConfig {
    /// Secret API key (starts with sk_)
    pub secret_key: String,
    /// API base URL; overridable so tests can point at a mock server
    #[serde(default = "default_paymongo_api_url")]
    pub api_url: String,
    /// Webhook signing secret. When unset, webhook signatures are not checked.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_paymongo_api_url() -> String {
    "https://api.paymongo.com/v1".to_string()
}

/// Dummy gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DummyGatewayConfig {
    /// Payment-intent status the gateway reports (e.g. "succeeded",
    /// "payment_failed", "processing")
    pub intent_status: String,
    /// Instrument type reported with successful payments
    pub source_type: Option<String>,
}

impl Default for DummyGatewayConfig {
    fn default() -> Self {
        Self {
            intent_status: "succeeded".to_string(),
            source_type: Some("gcash".to_string()),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; "*" for any
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.gateway.is_none());
        assert_eq!(config.cors.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn gateway_config_parses_from_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                secret_key: "test-secret"
                gateway:
                  paymongo:
                    secret_key: "sk_test_abc"
                "#,
            )?;
            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            match config.gateway {
                Some(GatewayConfig::Paymongo(paymongo)) => {
                    assert_eq!(paymongo.secret_key, "sk_test_abc");
                    assert_eq!(paymongo.api_url, "https://api.paymongo.com/v1");
                    assert!(paymongo.webhook_secret.is_none());
                }
                other => panic!("expected paymongo gateway, got {other:?}"),
            }
            Ok(())
        });
    }
}
