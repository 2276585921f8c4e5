//! aside-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `{APP_ENV}.toml` → `ASIDE_` 前缀环境变量（`__` 分隔层级）

use std::fmt;
use std::str::FromStr;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 缓存策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// 固定过期时间
    #[default]
    Plain,
    /// 随机过期时间（防雪崩）
    RandomTtl,
    /// 空值缓存（防穿透）
    NullMarker,
    /// 布隆过滤器前置检查（防穿透）
    BloomGated,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Plain,
        StrategyKind::RandomTtl,
        StrategyKind::NullMarker,
        StrategyKind::BloomGated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::RandomTtl => "random_ttl",
            Self::NullMarker => "null_marker",
            Self::BloomGated => "bloom_gated",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown cache strategy: {}", s)))
    }
}

/// 更新数据时的缓存一致性策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// 更新缓存（读多写少）
    #[default]
    Refresh,
    /// 删除缓存（写多读少、一致性要求高）
    Invalidate,
}

impl fmt::Display for ConsistencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
            Self::Invalidate => f.write_str("invalidate"),
        }
    }
}

impl FromStr for ConsistencyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(Self::Refresh),
            "invalidate" => Ok(Self::Invalidate),
            other => Err(ConfigError::Invalid(format!(
                "unknown consistency policy: {}",
                other
            ))),
        }
    }
}

/// 布隆过滤器配置
#[derive(Debug, Clone, Deserialize)]
pub struct BloomConfig {
    #[serde(default = "default_bloom_key")]
    pub key: String,
    /// 预期元素数量
    #[serde(default = "default_bloom_capacity")]
    pub capacity: u64,
    /// 期望的误判率
    #[serde(default = "default_bloom_error_rate")]
    pub error_rate: f64,
}

fn default_bloom_key() -> String {
    "user_bloom_filter".to_string()
}

fn default_bloom_capacity() -> u64 {
    1_000_000
}

fn default_bloom_error_rate() -> f64 {
    0.01
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            key: default_bloom_key(),
            capacity: default_bloom_capacity(),
            error_rate: default_bloom_error_rate(),
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default)]
    pub strategy: StrategyKind,
    /// 正常数据过期时间（秒），非正数时回落到 300
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,
    /// 随机抖动范围占基础过期时间的百分比
    #[serde(default = "default_jitter_percent")]
    pub jitter_percent: u32,
    /// 空值标记过期时间（秒）
    #[serde(default = "default_null_ttl_secs")]
    pub null_ttl_secs: u64,
    #[serde(default)]
    pub consistency: ConsistencyPolicy,
    #[serde(default)]
    pub bloom: BloomConfig,
}

pub const DEFAULT_TTL_SECS: u64 = 300;

fn default_key_prefix() -> String {
    "user:".to_string()
}

fn default_ttl_secs() -> i64 {
    DEFAULT_TTL_SECS as i64
}

fn default_jitter_percent() -> u32 {
    10
}

fn default_null_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            strategy: StrategyKind::default(),
            default_ttl_secs: default_ttl_secs(),
            jitter_percent: default_jitter_percent(),
            null_ttl_secs: default_null_ttl_secs(),
            consistency: ConsistencyPolicy::default(),
            bloom: BloomConfig::default(),
        }
    }
}

impl CacheConfig {
    /// 生效的正常数据过期时间（秒）
    pub fn effective_ttl_secs(&self) -> u64 {
        if self.default_ttl_secs <= 0 {
            DEFAULT_TTL_SECS
        } else {
            self.default_ttl_secs as u64
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid("cache.key_prefix must not be empty".into()));
        }
        if self.jitter_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "cache.jitter_percent must be within 0..=100, got {}",
                self.jitter_percent
            )));
        }
        if self.null_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.null_ttl_secs must be positive".into()));
        }
        if !(self.bloom.error_rate > 0.0 && self.bloom.error_rate < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cache.bloom.error_rate must be within (0, 1), got {}",
                self.bloom.error_rate
            )));
        }
        Ok(())
    }
}

/// 分布式锁配置
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_prefix")]
    pub prefix: String,
    /// 租约时长（秒），需覆盖临界区执行时间
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
    #[serde(default = "default_lock_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_lock_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_lock_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_lock_prefix() -> String {
    "lock:".to_string()
}

fn default_lease_secs() -> u64 {
    10
}

fn default_lock_attempts() -> u32 {
    20
}

fn default_lock_initial_delay_ms() -> u64 {
    50
}

fn default_lock_max_delay_ms() -> u64 {
    1000
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            prefix: default_lock_prefix(),
            lease_secs: default_lease_secs(),
            max_attempts: default_lock_attempts(),
            initial_delay_ms: default_lock_initial_delay_ms(),
            max_delay_ms: default_lock_max_delay_ms(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("ASIDE_").split("__"))
            .extract()?;

        config.cache.validate()?;
        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

#[cfg(test)]
mod tests;
