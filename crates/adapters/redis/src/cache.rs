//! Redis Cache 实现

use async_trait::async_trait;
use aside_errors::{AppError, AppResult};
use aside_ports::CachePort;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;

/// 仅当值匹配时删除
pub(crate) const COMPARE_AND_DELETE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
";

/// TTL 命令的返回值换算为剩余时间，-2 表示键不存在，-1 表示没有过期时间
pub(crate) fn remaining_ttl(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().map(Duration::from_secs)
}

/// Redis 不接受 0 秒过期，不足一秒按一秒处理
pub(crate) fn expire_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis get failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(duration) => conn
                .set_ex(key, value, expire_secs(duration))
                .await
                .map_err(|e| AppError::store_unavailable(format!("Redis set failed: {}", e))),
            None => conn
                .set(key, value)
                .await
                .map_err(|e| AppError::store_unavailable(format!("Redis set failed: {}", e))),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis delete failed: {}", e)))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis exists failed: {}", e)))
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let secs: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis ttl failed: {}", e)))?;
        Ok(remaining_ttl(secs))
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.keys(pattern)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis keys failed: {}", e)))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(expire_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis set_nx failed: {}", e)))?;

        Ok(result.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let deleted: i64 = Script::new(COMPARE_AND_DELETE)
            .key(key)
            .arg(expected_value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AppError::store_unavailable(format!("Redis delete_if_equals failed: {}", e))
            })?;

        Ok(deleted > 0)
    }
}
