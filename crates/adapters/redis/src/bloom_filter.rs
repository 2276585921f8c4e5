//! 基于 RedisBloom 模块的布隆过滤器
//!
//! 需要服务端加载 RedisBloom（`BF.*` 命令）

use async_trait::async_trait;
use aside_errors::{AppError, AppResult};
use aside_ports::BloomMembership;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

/// Redis 布隆过滤器
pub struct RedisBloomFilter {
    conn: ConnectionManager,
    /// 过滤器所在的键
    key: String,
    /// 预期元素数量
    capacity: u64,
    /// 期望的误判率
    error_rate: f64,
}

impl RedisBloomFilter {
    pub fn new(conn: ConnectionManager, key: impl Into<String>, capacity: u64, error_rate: f64) -> Self {
        Self {
            conn,
            key: key.into(),
            capacity,
            error_rate,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 按容量和误判率创建过滤器，已存在时不做任何事
    pub async fn reserve(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();

        // BF.RESERVE {key} {error_rate} {capacity}
        let result: Result<String, redis::RedisError> = redis::cmd("BF.RESERVE")
            .arg(&self.key)
            .arg(self.error_rate)
            .arg(self.capacity)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    key = %self.key,
                    capacity = self.capacity,
                    error_rate = self.error_rate,
                    "Bloom filter reserved"
                );
                Ok(())
            }
            Err(e) if is_already_reserved(&e.to_string()) => {
                debug!(key = %self.key, "Bloom filter already exists");
                Ok(())
            }
            Err(e) => Err(AppError::store_unavailable(format!(
                "Failed to reserve bloom filter: {}",
                e
            ))),
        }
    }
}

fn is_already_reserved(message: &str) -> bool {
    message.contains("item exists")
}

#[async_trait]
impl BloomMembership for RedisBloomFilter {
    async fn add(&self, item: &[u8]) -> AppResult<()> {
        let mut conn = self.conn.clone();

        // BF.ADD {key} {item}，返回值表示是否新增，重复添加不是错误
        let _: bool = redis::cmd("BF.ADD")
            .arg(&self.key)
            .arg(item)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                AppError::store_unavailable(format!("Failed to add to bloom filter: {}", e))
            })?;
        Ok(())
    }

    async fn may_exist(&self, item: &[u8]) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        // BF.EXISTS {key} {item}
        redis::cmd("BF.EXISTS")
            .arg(&self.key)
            .arg(item)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Failed to check bloom filter: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_connection_manager;

    #[test]
    fn test_already_reserved_detection() {
        assert!(is_already_reserved("ERR item exists"));
        assert!(!is_already_reserved("ERR unknown command 'BF.RESERVE'"));
    }

    #[tokio::test]
    #[ignore] // 需要加载 RedisBloom 模块的 Redis 实例
    async fn test_add_and_check() {
        let conn = create_connection_manager("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let bloom = RedisBloomFilter::new(conn, "aside:test:bloom", 1000, 0.01);
        bloom.reserve().await.unwrap();
        // 重复 reserve 不报错
        bloom.reserve().await.unwrap();

        bloom.add(b"user:1").await.unwrap();
        assert!(bloom.may_exist(b"user:1").await.unwrap());
        assert!(!bloom.may_exist(b"user:999999").await.unwrap());
    }
}
