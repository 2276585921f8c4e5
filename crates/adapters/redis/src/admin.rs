//! 运维命令：按模式清理、内存淘汰配置、统计
//!
//! 仅供重置工具和淘汰策略演示使用，不在查询路径上

use std::fmt;
use std::str::FromStr;

use aside_errors::{AppError, AppResult};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

/// Redis `maxmemory-policy` 取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionPolicy {
    AllKeysLru,
    VolatileLru,
    AllKeysLfu,
    VolatileLfu,
    AllKeysRandom,
    VolatileRandom,
    VolatileTtl,
    NoEviction,
}

impl EvictionPolicy {
    pub const ALL: [EvictionPolicy; 8] = [
        Self::AllKeysLru,
        Self::VolatileLru,
        Self::AllKeysLfu,
        Self::VolatileLfu,
        Self::AllKeysRandom,
        Self::VolatileRandom,
        Self::VolatileTtl,
        Self::NoEviction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllKeysLru => "allkeys-lru",
            Self::VolatileLru => "volatile-lru",
            Self::AllKeysLfu => "allkeys-lfu",
            Self::VolatileLfu => "volatile-lfu",
            Self::AllKeysRandom => "allkeys-random",
            Self::VolatileRandom => "volatile-random",
            Self::VolatileTtl => "volatile-ttl",
            Self::NoEviction => "noeviction",
        }
    }

    /// 只淘汰设置了过期时间的键
    pub fn is_volatile(&self) -> bool {
        matches!(
            self,
            Self::VolatileLru | Self::VolatileLfu | Self::VolatileRandom | Self::VolatileTtl
        )
    }

    /// 按访问频率淘汰
    pub fn is_lfu(&self) -> bool {
        matches!(self, Self::AllKeysLfu | Self::VolatileLfu)
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == normalized)
            .ok_or_else(|| AppError::invalid_argument(format!("Unknown eviction policy: {}", s)))
    }
}

/// 当前的内存上限与淘汰策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionSettings {
    /// 字节数，0 表示不限制
    pub max_memory: u64,
    pub policy: String,
}

/// Redis 运维命令
#[derive(Clone)]
pub struct RedisAdmin {
    conn: ConnectionManager,
}

impl RedisAdmin {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// 删除匹配模式的所有键，返回删除数量
    ///
    /// 使用 KEYS，只适合演示规模的数据
    pub async fn delete_matching(&self, pattern: &str) -> AppResult<usize> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis keys failed: {}", e)))?;

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: usize = conn
            .del(&keys)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis delete failed: {}", e)))?;
        info!(pattern, deleted, "Deleted matching keys");
        Ok(deleted)
    }

    /// 设置内存上限（如 `5mb`）和淘汰策略
    pub async fn configure_eviction(&self, max_memory: &str, policy: EvictionPolicy) -> AppResult<()> {
        self.config_set("maxmemory", max_memory).await?;
        self.config_set("maxmemory-policy", policy.as_str()).await?;
        info!(max_memory, policy = %policy, "Eviction configured");
        Ok(())
    }

    pub async fn eviction_settings(&self) -> AppResult<EvictionSettings> {
        let max_memory = self.config_get("maxmemory").await?;
        let policy = self.config_get("maxmemory-policy").await?;

        Ok(EvictionSettings {
            max_memory: max_memory.parse().map_err(|_| {
                AppError::internal(format!("Unexpected maxmemory value: {}", max_memory))
            })?,
            policy,
        })
    }

    /// 已用内存（字节）
    pub async fn used_memory(&self) -> AppResult<u64> {
        let mut conn = self.conn.clone();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis info failed: {}", e)))?;

        parse_info_field(&info, "used_memory")
            .ok_or_else(|| AppError::internal("used_memory missing from INFO output"))
    }

    pub async fn flush_db(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis flushdb failed: {}", e)))
    }

    pub async fn key_count(&self) -> AppResult<u64> {
        let mut conn = self.conn.clone();
        redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis dbsize failed: {}", e)))
    }

    async fn config_set(&self, name: &str, value: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("CONFIG")
            .arg("SET")
            .arg(name)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis config set {} failed: {}", name, e)))
    }

    async fn config_get(&self, name: &str) -> AppResult<String> {
        let mut conn = self.conn.clone();
        // 返回 [name, value]
        let reply: Vec<String> = redis::cmd("CONFIG")
            .arg("GET")
            .arg(name)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis config get {} failed: {}", name, e)))?;

        reply
            .into_iter()
            .nth(1)
            .ok_or_else(|| AppError::internal(format!("Redis config {} not found", name)))
    }
}

/// 从 INFO 输出中取出数值字段
pub(crate) fn parse_info_field(info: &str, field: &str) -> Option<u64> {
    info.lines()
        .filter_map(|line| line.trim().split_once(':'))
        .find(|(name, _)| *name == field)
        .and_then(|(_, value)| value.parse().ok())
}
