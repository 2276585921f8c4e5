//! Redis 分布式锁实现
//!
//! `SET key owner NX PX lease` 抢锁，Lua 比较后删除释放

use async_trait::async_trait;
use aside_errors::{AppError, AppResult};
use aside_ports::{DistributedLock, LockToken};
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::COMPARE_AND_DELETE;

/// Redis 分布式锁
pub struct RedisDistributedLock {
    conn: ConnectionManager,
    lock_prefix: String,
}

impl RedisDistributedLock {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            lock_prefix: "lock:".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_prefix = prefix.into();
        self
    }

    fn lock_key(&self, key: &str) -> String {
        lock_key(&self.lock_prefix, key)
    }
}

fn lock_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn acquire(&self, key: &str, lease: Duration) -> AppResult<Option<LockToken>> {
        let mut conn = self.conn.clone();
        let lock_key = self.lock_key(key);
        let owner = Uuid::new_v4().to_string();

        let result: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&owner)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis lock acquire failed: {}", e)))?;

        Ok(result.map(|_| LockToken {
            key: key.to_string(),
            owner,
        }))
    }

    async fn release(&self, token: &LockToken) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let deleted: i64 = Script::new(COMPARE_AND_DELETE)
            .key(self.lock_key(&token.key))
            .arg(&token.owner)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Redis lock release failed: {}", e)))?;

        Ok(deleted > 0)
    }
}
