use cinebook_core::expiry::MAX_CLAIM_SECONDS;
use cinebook_core::ExpiryPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    pub booking: BookingRules,
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    #[serde(default = "default_reservation_window")]
    pub reservation_window_seconds: u64,
    /// 0 turns the periodic expiry worker off; lazy sweeps still run.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_provider")]
    pub payment_provider: String,
}

fn default_lock_ttl() -> u64 { 300 }
fn default_reservation_window() -> u64 { 900 }
fn default_sweep_interval() -> u64 { 60 }
fn default_provider() -> String { "stripe".to_string() }

impl BookingRules {
    pub fn expiry_policy(&self) -> Result<ExpiryPolicy, config::ConfigError> {
        ExpiryPolicy::from_seconds(self.lock_ttl_seconds, self.reservation_window_seconds).ok_or_else(|| {
            config::ConfigError::Message(format!(
                "booking.lock_ttl_seconds and booking.reservation_window_seconds must be between 1 and {}",
                MAX_CLAIM_SECONDS
            ))
        })
    }
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: default_lock_ttl(),
            reservation_window_seconds: default_reservation_window(),
            sweep_interval_seconds: default_sweep_interval(),
            payment_provider: default_provider(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub webhook_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_window: 100, window_seconds: 60 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CINEBOOK_BOOKING__LOCK_TTL_SECONDS=120`
            .add_source(config::Environment::with_prefix("CINEBOOK").separator("__"))
            .build()?;

        let cfg: Self = s.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.booking.expiry_policy()?;
        if self.payments.webhook_secret.trim().is_empty() {
            return Err(config::ConfigError::Message("payments.webhook_secret must not be empty".into()));
        }
        Ok(())
    }
}
