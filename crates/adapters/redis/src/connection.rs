//! Redis 连接管理

use aside_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::ConnectionManager;

/// 创建 Redis 连接管理器
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::internal(format!("Failed to create Redis client: {}", e)))?;

    ConnectionManager::new(client).await.map_err(|e| {
        AppError::store_unavailable(format!("Failed to create Redis connection manager: {}", e))
    })
}

/// 检查 Redis 连接
pub async fn check_connection(conn: &mut ConnectionManager) -> AppResult<()> {
    redis::cmd("PING")
        .query_async::<String>(conn)
        .await
        .map_err(|e| AppError::store_unavailable(format!("Redis health check failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let Err(err) = create_connection_manager("not-a-redis-url").await else {
            panic!("expected invalid url to be rejected");
        };
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    #[ignore] // 需要 Redis 实例
    async fn test_ping() {
        let mut conn = create_connection_manager("redis://127.0.0.1:6379")
            .await
            .unwrap();
        check_connection(&mut conn).await.unwrap();
    }
}
