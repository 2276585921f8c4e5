//! 分布式锁 trait 定义

use async_trait::async_trait;
use aside_errors::AppResult;
use std::time::Duration;

/// 持锁凭证
///
/// `owner` 唯一标识本次持有，释放时用于校验，避免误删他人的锁
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub key: String,
    pub owner: String,
}

/// 分布式锁 trait
///
/// 租约到期后由存储端自动回收，这只是兜底，持有方仍需及时释放
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// 尝试获取锁，`Ok(None)` 表示锁已被占用
    async fn acquire(&self, key: &str, lease: Duration) -> AppResult<Option<LockToken>>;

    /// 释放锁，返回 false 表示租约已过期或已被他人持有
    async fn release(&self, token: &LockToken) -> AppResult<bool>;
}
