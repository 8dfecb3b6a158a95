//! Configuration management for FxGate.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{FxGateError, Result};
use crate::rates::{default_usd_rates, CurrencyCode};
use crate::ratelimit::{RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_PERIOD};

/// Prefix for environment variable overrides, e.g. `FXGATE_SERVER__LISTEN_ADDR`.
const ENV_PREFIX: &str = "FXGATE";

/// Main configuration for the FxGate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Rate cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream rate source configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Bearer token configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Whether identified requests are rate limited at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum requests per tenant per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Window length in seconds
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

impl RateLimitingConfig {
    /// The limiter policy described by this section.
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.max_requests,
            period: Duration::from_secs(self.period_secs),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            period_secs: default_period_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u64 {
    DEFAULT_MAX_REQUESTS
}

fn default_period_secs() -> u64 {
    DEFAULT_PERIOD.as_secs()
}

/// Rate cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Absolute lifetime of a cached rate in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    crate::rates::DEFAULT_TTL.as_secs()
}

/// Upstream rate source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Simulated latency of every upstream lookup in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// USD value of one unit of each supported currency
    #[serde(default = "default_usd_rates")]
    pub usd_rates: HashMap<CurrencyCode, Decimal>,
}

impl UpstreamConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            usd_rates: default_usd_rates(),
        }
    }
}

fn default_latency_ms() -> u64 {
    3000
}

/// Bearer token configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token -> tenant name
    #[serde(default)]
    pub tenants: HashMap<Uuid, String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatewayConfig {
    /// Load configuration from an optional YAML file with `FXGATE_*` environment overrides.
    ///
    /// Nested keys use `__` in variable names, e.g. `FXGATE_RATE_LIMITING__MAX_REQUESTS=25`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: GatewayConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file path, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GatewayConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FxGateError::Config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.max_requests == 0 {
            return Err(FxGateError::Config(
                "rate_limiting.max_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limiting.period_secs == 0 {
            return Err(FxGateError::Config(
                "rate_limiting.period_secs must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(FxGateError::Config(
                "cache.ttl_secs must be at least 1".to_string(),
            ));
        }
        if let Some((code, rate)) = self
            .upstream
            .usd_rates
            .iter()
            .find(|(_, rate)| rate.is_sign_negative() || rate.is_zero())
        {
            return Err(FxGateError::Config(format!(
                "upstream.usd_rates.{code} must be positive, got {rate}"
            )));
        }
        if let Some(token) = self
            .auth
            .tenants
            .iter()
            .find_map(|(token, tenant)| tenant.trim().is_empty().then_some(token))
        {
            return Err(FxGateError::Config(format!(
                "auth.tenants.{token} has an empty tenant name"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.server.listen_addr.to_string(), "127.0.0.1:8080");
        assert!(config.rate_limiting.enabled);
        assert_eq!(config.rate_limiting.policy(), RateLimitPolicy::default());
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.upstream.latency(), Duration::from_secs(3));
        assert_eq!(config.upstream.usd_rates.len(), 5);
        assert!(config.auth.tenants.is_empty());
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GatewayConfig::from_yaml(
            r#"
rate_limiting:
  max_requests: 25
  period_secs: 300
auth:
  tenants:
    71fe92a8-e54b-4e99-a130-d960dcd0436e: acme
"#,
        )
        .unwrap();

        assert_eq!(config.rate_limiting.max_requests, 25);
        assert_eq!(
            config.rate_limiting.policy().period,
            Duration::from_secs(300)
        );
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.auth.tenants.len(), 1);
        assert_eq!(config.server.listen_addr.port(), 8080);
    }

    #[test]
    fn test_usd_rates_codes_are_normalized() {
        let config = GatewayConfig::from_yaml(
            r#"
upstream:
  latency_ms: 0
  usd_rates:
    usd: "1"
    jpy: "0.0067"
"#,
        )
        .unwrap();

        let jpy: CurrencyCode = "JPY".parse().unwrap();
        assert_eq!(config.upstream.usd_rates.get(&jpy), Some(&dec!(0.0067)));
        assert_eq!(config.upstream.latency(), Duration::ZERO);
    }

    #[test]
    fn test_log_format_parses() {
        let config = GatewayConfig::from_yaml("logging:\n  level: debug\n  format: json\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_rejects_zero_limits() {
        assert!(GatewayConfig::from_yaml("rate_limiting:\n  max_requests: 0\n").is_err());
        assert!(GatewayConfig::from_yaml("rate_limiting:\n  period_secs: 0\n").is_err());
        assert!(GatewayConfig::from_yaml("cache:\n  ttl_secs: 0\n").is_err());
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let err = GatewayConfig::from_yaml("upstream:\n  usd_rates:\n    USD: \"0\"\n").unwrap_err();
        assert!(err.to_string().contains("upstream.usd_rates.USD"));
    }

    #[test]
    fn test_rejects_empty_tenant_name() {
        let yaml = "auth:\n  tenants:\n    ac72fe70-bc7c-431e-b27c-292beb6ed350: \"  \"\n";
        assert!(GatewayConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = GatewayConfig::from_yaml("server: [").unwrap_err();
        assert!(matches!(err, FxGateError::Config(_)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.rate_limiting.max_requests, DEFAULT_MAX_REQUESTS);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("fxgate-{}.yaml", Uuid::new_v4()));
        std::fs::write(&path, "cache:\n  ttl_secs: 120\n").unwrap();

        let config = GatewayConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.cache.ttl(), Duration::from_secs(120));
    }

    #[test]
    fn test_bundled_sample_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/fxgate.yaml");
        let config = GatewayConfig::load(Some(&path)).unwrap();

        assert_eq!(config.auth.tenants.len(), 2);
        let gbp: CurrencyCode = "GBP".parse().unwrap();
        assert_eq!(config.upstream.usd_rates.get(&gbp), Some(&dec!(1.20)));
    }
}
