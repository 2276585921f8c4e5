//! 基础设施资源管理
//!
//! 统一创建 PostgreSQL 连接池和 Redis 连接，并按端口类型分发

use std::sync::Arc;

use aside_adapter_postgres::{
    PgUserRepository, PostgresConfig, check_connection, create_pool, ensure_schema,
};
use aside_adapter_redis::{
    RedisAdmin, RedisBloomFilter, RedisCache, RedisDistributedLock,
    check_connection as redis_check, create_connection_manager,
};
use aside_common::{RetryConfig, with_retry};
use aside_config::AppConfig;
use aside_errors::{AppError, AppResult};
use aside_ports::{BloomMembership, CachePort, DistributedLock};
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Redis 连接管理器
    redis_conn: ConnectionManager,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    ///
    /// 同时确保 users 表存在
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        // 1. PostgreSQL 连接池
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections);
        let postgres_pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move {
                let pool = create_pool(&cfg).await?;
                check_connection(&pool).await?;
                Ok::<_, AppError>(pool)
            }
        })
        .await?;
        info!(
            "PostgreSQL connection pool created (max_connections: {})",
            config.database.max_connections
        );
        ensure_schema(&postgres_pool).await?;

        // 2. Redis 连接
        let redis_url = config.redis.url.clone();
        let redis_conn = with_retry(&retry_config, "Redis connection", || {
            let url = redis_url.expose_secret().clone();
            async move {
                let mut conn = create_connection_manager(&url).await?;
                redis_check(&mut conn).await?;
                Ok::<_, AppError>(conn)
            }
        })
        .await?;
        info!("Redis connection created");

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
        })
    }

    /// 获取应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 键值存储
    pub fn cache(&self) -> Arc<dyn CachePort> {
        Arc::new(RedisCache::new(self.redis_conn.clone()))
    }

    /// 布隆过滤器（未 reserve，调用方需要时自行调用 `reserve`）
    pub fn bloom_filter(&self) -> RedisBloomFilter {
        let bloom = &self.config.cache.bloom;
        RedisBloomFilter::new(
            self.redis_conn.clone(),
            bloom.key.clone(),
            bloom.capacity,
            bloom.error_rate,
        )
    }

    /// 已 reserve 的布隆过滤器
    pub async fn bloom(&self) -> AppResult<Arc<dyn BloomMembership>> {
        let bloom = self.bloom_filter();
        bloom.reserve().await?;
        Ok(Arc::new(bloom))
    }

    /// 分布式锁，键前缀取自配置
    pub fn lock(&self) -> Arc<dyn DistributedLock> {
        Arc::new(
            RedisDistributedLock::new(self.redis_conn.clone())
                .with_prefix(self.config.lock.prefix.clone()),
        )
    }

    /// Redis 运维命令
    pub fn redis_admin(&self) -> RedisAdmin {
        RedisAdmin::new(self.redis_conn.clone())
    }

    /// 用户仓储
    pub fn user_repository(&self) -> Arc<PgUserRepository> {
        Arc::new(PgUserRepository::new(self.postgres_pool.clone()))
    }
}
