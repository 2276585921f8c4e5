//! 布隆过滤器 trait 定义

use async_trait::async_trait;
use aside_errors::AppResult;

/// 近似成员判断
///
/// 不允许假阴性：添加过的元素 `may_exist` 必须返回 true。
/// 只追加，不提供删除
#[async_trait]
pub trait BloomMembership: Send + Sync {
    /// 添加元素
    async fn add(&self, item: &[u8]) -> AppResult<()>;

    /// 检查元素是否可能存在，false 表示一定不存在
    async fn may_exist(&self, item: &[u8]) -> AppResult<bool>;
}
