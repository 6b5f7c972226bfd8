//! Configuration loading for the engine's own tuning knobs.
//!
//! YAML with `${VAR}` / `${VAR:-default}` environment interpolation,
//! mirroring the teacher's `config.rs`. The historical-data source, the
//! real persistence layer, the transport, and any HTTP surface remain out
//! of scope (§1), so there is no server/broker/feed configuration here —
//! only the knobs the Replay Engine and Order Execution Engine actually
//! read.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session buffer tuning.
    #[serde(default)]
    pub buffer: BufferConfig,
    /// Order Execution Engine tuning.
    #[serde(default)]
    pub order_execution: OrderExecutionConfig,
    /// Candle Source retry schedule.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Default session funding.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            order_execution: OrderExecutionConfig::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Buffer tuning (§4.2 point 3): high-water mark, prefetch threshold, and
/// the rewind safety margin applied on a `SetSpeed` base-interval change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Candle count above which the buffer is trimmed from the front.
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,
    /// Candles retained behind the read cursor when trimming, so a small
    /// rewind doesn't immediately require a reload.
    #[serde(default = "default_rewind_margin")]
    pub rewind_margin: usize,
    /// Consumption ratio (0.0-1.0) past which a background prefetch fires.
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: f64,
    /// Base-interval candles fetched backwards as a safety margin when
    /// `SetSpeed` changes the base interval.
    #[serde(default = "default_rewind_safety_margin_candles")]
    pub rewind_safety_margin_candles: i64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            high_water_mark: default_high_water_mark(),
            rewind_margin: default_rewind_margin(),
            prefetch_threshold: default_prefetch_threshold(),
            rewind_safety_margin_candles: default_rewind_safety_margin_candles(),
        }
    }
}

fn default_high_water_mark() -> usize {
    5_000
}
fn default_rewind_margin() -> usize {
    100
}
fn default_prefetch_threshold() -> f64 {
    0.8
}
fn default_rewind_safety_margin_candles() -> i64 {
    10
}

/// Order Execution Engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExecutionConfig {
    /// Fractional fee applied to every fill's notional (§4.3).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
}

impl Default for OrderExecutionConfig {
    fn default() -> Self {
        Self { fee_rate: default_fee_rate() }
    }
}

fn default_fee_rate() -> f64 {
    0.001
}

/// Candle Source retry schedule (§4.2, §7): a fixed, non-exponential
/// backoff applied across `maxAttempts` tries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts before giving up.
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    /// Delay (milliseconds) before each retry, in order. Length must be
    /// `max_attempts - 1`.
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> Vec<u64> {
    vec![2_000, 4_000]
}

/// Default session-start parameters used by the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default cash funding for a newly started session.
    #[serde(default = "default_initial_funding")]
    pub default_initial_funding: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_initial_funding: default_initial_funding(),
        }
    }
}

fn default_initial_funding() -> f64 {
    10_000.0
}

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;
    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
fn interpolate_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("pattern is a fixed, valid regex");

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        let default_value = caps.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.unwrap_or_default().to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.buffer.high_water_mark == 0 {
        return Err(ConfigError::ValidationError("buffer.high_water_mark must be positive".to_string()));
    }
    if config.buffer.rewind_margin >= config.buffer.high_water_mark {
        return Err(ConfigError::ValidationError("buffer.rewind_margin must be smaller than high_water_mark".to_string()));
    }
    if !(0.0..=1.0).contains(&config.buffer.prefetch_threshold) {
        return Err(ConfigError::ValidationError("buffer.prefetch_threshold must be between 0.0 and 1.0".to_string()));
    }
    if config.buffer.rewind_safety_margin_candles <= 0 {
        return Err(ConfigError::ValidationError("buffer.rewind_safety_margin_candles must be positive".to_string()));
    }
    if !(0.0..1.0).contains(&config.order_execution.fee_rate) {
        return Err(ConfigError::ValidationError("order_execution.fee_rate must be in [0.0, 1.0)".to_string()));
    }
    if config.retry.max_attempts < 1 {
        return Err(ConfigError::ValidationError("retry.max_attempts must be at least 1".to_string()));
    }
    if config.retry.backoff_ms.len() as u32 != config.retry.max_attempts.saturating_sub(1) {
        return Err(ConfigError::ValidationError("retry.backoff_ms must have max_attempts - 1 entries".to_string()));
    }
    if config.session.default_initial_funding <= 0.0 {
        return Err(ConfigError::ValidationError("session.default_initial_funding must be positive".to_string()));
    }
    Ok(())
}
