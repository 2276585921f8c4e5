//! 缓存旁路查询服务
//!
//! 读：布隆过滤器（可选）→ 缓存 → 仓储 → 回填缓存
//! 写：先写仓储，再按一致性策略更新或删除缓存
//!
//! 仓储错误对调用方可见；缓存层错误只记录日志和指标，不影响仓储已成功的操作

use std::sync::Arc;
use std::time::Duration;

use aside_config::{CacheConfig, ConsistencyPolicy};
use aside_errors::{AppError, AppResult};
use aside_ports::{BloomMembership, CachePort, Repository};
use tracing::{debug, info, warn};

use crate::model::Record;
use crate::strategy::{CacheLookup, CacheStrategy};

fn record_lookup(outcome: &'static str) {
    metrics::counter!("cache_lookup_total", "outcome" => outcome).increment(1);
}

fn record_cache_failure(op: &'static str) {
    metrics::counter!("cache_write_failures_total", "op" => op).increment(1);
}

/// 查询服务
pub struct LookupService<R> {
    repo: Arc<dyn Repository<R>>,
    strategy: CacheStrategy<R>,
    consistency: ConsistencyPolicy,
    ttl: Option<Duration>,
}

impl<R: Record> LookupService<R> {
    pub fn new(repo: Arc<dyn Repository<R>>, strategy: CacheStrategy<R>) -> Self {
        Self {
            repo,
            strategy,
            consistency: ConsistencyPolicy::default(),
            ttl: None,
        }
    }

    /// 按配置构建策略与服务
    pub fn from_config(
        config: &CacheConfig,
        repo: Arc<dyn Repository<R>>,
        store: Arc<dyn CachePort>,
        bloom: Option<Arc<dyn BloomMembership>>,
    ) -> AppResult<Self> {
        let strategy = CacheStrategy::from_config(config, store, bloom)?;
        Ok(Self::new(repo, strategy).with_consistency(config.consistency))
    }

    pub fn with_consistency(mut self, consistency: ConsistencyPolicy) -> Self {
        self.consistency = consistency;
        self
    }

    /// 覆盖回填时使用的过期时间，None 使用策略默认值
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn strategy(&self) -> &CacheStrategy<R> {
        &self.strategy
    }

    pub fn consistency(&self) -> ConsistencyPolicy {
        self.consistency
    }

    /// 根据 ID 获取记录
    ///
    /// 不存在时返回 `NotFound`；仓储故障返回 `Repository`；缓存载荷损坏返回 `Serialization`
    pub async fn get_by_id(&self, id: i64) -> AppResult<R> {
        match self.strategy.read(id).await {
            Ok(CacheLookup::Hit(record)) => {
                debug!(id, "Cache hit");
                record_lookup("hit");
                return Ok(record);
            }
            Ok(CacheLookup::Absent) => {
                debug!(id, "Confirmed absent by cache");
                record_lookup("absent");
                return Err(AppError::not_found(format!("record {} does not exist", id)));
            }
            Ok(CacheLookup::Rejected) => {
                debug!(id, "Rejected by bloom filter");
                record_lookup("bloom_reject");
                return Err(AppError::not_found(format!("record {} does not exist", id)));
            }
            Ok(CacheLookup::Miss) => {
                debug!(id, "Cache miss, querying repository");
                record_lookup("miss");
            }
            Err(e @ AppError::StoreUnavailable(_)) => {
                warn!(id, error = %e, "Cache read failed, falling back to repository");
                record_lookup("store_error");
            }
            Err(e) => return Err(e),
        }

        metrics::counter!("repository_reads_total").increment(1);
        let Some(record) = self.repo.find_by_id(id).await? else {
            debug!(id, "Record not found in repository");
            if let Err(e) = self.strategy.mark_absent(id).await {
                warn!(id, error = %e, "Failed to write absent marker");
                record_cache_failure("mark_absent");
            }
            return Err(AppError::not_found(format!("record {} does not exist", id)));
        };

        self.populate(&record, "populate").await;
        if let Err(e) = self.strategy.register(id).await {
            warn!(id, error = %e, "Failed to register id in bloom filter");
            record_cache_failure("register");
        }

        Ok(record)
    }

    /// 创建记录，不预先写缓存
    pub async fn create(&self, record: &R) -> AppResult<R> {
        let created = self.repo.create(record).await?;
        info!(id = created.id(), "Record created");

        if let Err(e) = self.strategy.register(created.id()).await {
            warn!(id = created.id(), error = %e, "Failed to register id in bloom filter");
            record_cache_failure("register");
        }

        Ok(created)
    }

    /// 更新记录：先写仓储，再按一致性策略处理缓存
    pub async fn update(&self, record: &R) -> AppResult<()> {
        self.repo.update(record).await?;

        match self.consistency {
            ConsistencyPolicy::Refresh => {
                self.populate(record, "refresh").await;
            }
            ConsistencyPolicy::Invalidate => self.invalidate(record.id()).await,
        }

        info!(id = record.id(), consistency = %self.consistency, "Record updated");
        Ok(())
    }

    /// 删除记录：先删仓储，再删缓存
    ///
    /// 布隆过滤器不支持删除，已删除的 id 会一直被判定为「可能存在」
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.repo.delete(id).await?;
        self.invalidate(id).await;
        info!(id, "Record deleted");
        Ok(())
    }

    /// 批量预热缓存，返回写入成功的条数
    ///
    /// 仓储中不存在的 id 跳过
    pub async fn warm_up(&self, ids: &[i64]) -> AppResult<usize> {
        let mut written = 0;
        for &id in ids {
            let Some(record) = self.repo.find_by_id(id).await? else {
                debug!(id, "Skipping warm-up for missing record");
                continue;
            };
            if self.populate(&record, "warm_up").await {
                written += 1;
            }
            if let Err(e) = self.strategy.register(id).await {
                warn!(id, error = %e, "Failed to register id in bloom filter");
                record_cache_failure("register");
            }
        }
        info!(requested = ids.len(), written, "Cache warm-up finished");
        Ok(written)
    }

    async fn populate(&self, record: &R, op: &'static str) -> bool {
        match self.strategy.write(record, self.ttl).await {
            Ok(expire) => {
                debug!(id = record.id(), op, expire_secs = expire.as_secs(), "Cache populated");
                true
            }
            Err(e) => {
                warn!(id = record.id(), op, error = %e, "Cache write failed, serving repository value");
                record_cache_failure(op);
                false
            }
        }
    }

    async fn invalidate(&self, id: i64) {
        if let Err(e) = self.strategy.delete(id).await {
            warn!(id, error = %e, "Cache invalidation failed");
            record_cache_failure("invalidate");
        }
    }
}
