//! Application configuration management.
//!
//! Sources are layered in order: `config/default.toml`,
//! `config/{RUN_MODE}.toml`, then `ENROLLO__*` environment variables
//! (e.g. `ENROLLO__ENROLLMENT__PER_UNIT_RATE=650.00`).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::check_money;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Enrollment fee and workflow settings.
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
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
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT verification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret shared with the identity provider.
    pub secret: String,
    /// Lifetime of locally issued tokens, in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

fn default_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Enrollment fee and workflow settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentConfig {
    /// Charge per enrolled unit.
    #[serde(default = "default_per_unit_rate", with = "rust_decimal::serde::str")]
    pub per_unit_rate: Decimal,
    /// How many times an operation is retried after a concurrency conflict.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Base backoff between conflict retries, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            per_unit_rate: default_per_unit_rate(),
            conflict_retries: default_conflict_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl EnrollmentConfig {
    /// Rejects a rate the ledger cannot apply without rounding drift.
    ///
    /// The assessment subtotal is re-derived from the stored total on every
    /// recomputation, so the rate must be representable at the column scale.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` if the rate is negative, too large, or
    /// has more than two decimal places.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.per_unit_rate.is_sign_negative() && !self.per_unit_rate.is_zero() {
            return Err(config::ConfigError::Message(format!(
                "enrollment.per_unit_rate cannot be negative: {}",
                self.per_unit_rate
            )));
        }
        check_money(self.per_unit_rate)
            .map(|_| ())
            .map_err(|e| config::ConfigError::Message(format!("enrollment.per_unit_rate: {e}")))
    }
}

fn default_per_unit_rate() -> Decimal {
    Decimal::new(70_000, 2) // 700.00
}

fn default_conflict_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    25
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the enrollment
    /// settings are invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ENROLLO").separator("__"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.enrollment.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_enrollment_defaults() {
        let cfg = EnrollmentConfig::default();
        assert_eq!(cfg.per_unit_rate, dec!(700.00));
        assert_eq!(cfg.conflict_retries, 1);
        assert_eq!(cfg.retry_backoff_ms, 25);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-none")),
                ("ENROLLO__DATABASE__URL", Some("postgres://localhost/enrollo")),
                ("ENROLLO__JWT__SECRET", Some("secret")),
                ("ENROLLO__ENROLLMENT__PER_UNIT_RATE", Some("650.50")),
                ("ENROLLO__SERVER__PORT", Some("9090")),
            ],
            || {
                let cfg = AppConfig::load().unwrap();
                assert_eq!(cfg.database.url, "postgres://localhost/enrollo");
                assert_eq!(cfg.database.max_connections, 10);
                assert_eq!(cfg.jwt.secret, "secret");
                assert_eq!(cfg.jwt.token_expiry_secs, 900);
                assert_eq!(cfg.server.port, 9090);
                assert_eq!(cfg.server.host, "0.0.0.0");
                assert_eq!(cfg.enrollment.per_unit_rate, dec!(650.50));
                assert_eq!(cfg.enrollment.conflict_retries, 1);
            },
        );
    }

    #[rstest::rstest]
    #[case("700.005")]
    #[case("-1.00")]
    #[case("1000000000000")]
    fn test_load_rejects_unstorable_rate(#[case] rate: &str) {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-none")),
                ("ENROLLO__DATABASE__URL", Some("postgres://localhost/enrollo")),
                ("ENROLLO__JWT__SECRET", Some("secret")),
                ("ENROLLO__ENROLLMENT__PER_UNIT_RATE", Some(rate)),
            ],
            || {
                let err = AppConfig::load().unwrap_err();
                assert!(err.to_string().contains("per_unit_rate"), "{err}");
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-none")),
                ("ENROLLO__DATABASE__URL", None::<&str>),
                ("ENROLLO__JWT__SECRET", Some("secret")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
