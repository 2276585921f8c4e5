//! Repository trait 定义

use async_trait::async_trait;
use aside_errors::AppResult;

/// 数据仓储 trait，数据的唯一可信来源
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// 根据 ID 查找，`Ok(None)` 表示记录不存在
    async fn find_by_id(&self, id: i64) -> AppResult<Option<T>>;

    /// 创建实体，返回带有仓储分配 ID 的实体
    async fn create(&self, entity: &T) -> AppResult<T>;

    /// 更新实体
    async fn update(&self, entity: &T) -> AppResult<()>;

    /// 删除实体，记录不存在不视为错误
    async fn delete(&self, id: i64) -> AppResult<()>;
}
