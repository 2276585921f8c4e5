//! Cache trait 定义

use async_trait::async_trait;
use aside_errors::AppResult;
use std::time::Duration;

/// 键值存储 trait
///
/// 实现方负责自身的并发控制，单次写入必须是原子的
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值，`ttl` 为 None 表示永不过期
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存，键不存在不视为错误
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// 剩余过期时间，None 表示键不存在或没有过期时间
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// 按模式列出键（仅供运维/重置工具使用）
    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>>;

    /// 仅当键不存在时设置
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// 仅当值匹配时删除，返回是否删除
    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool>;
}
