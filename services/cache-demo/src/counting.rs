//! 统计仓储读取次数，用于对比各策略对数据库的压力

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use aside_cache_core::Record;
use aside_errors::AppResult;
use aside_ports::Repository;

pub struct CountingRepository<R> {
    inner: Arc<dyn Repository<R>>,
    reads: AtomicUsize,
}

impl<R: Record> CountingRepository<R> {
    pub fn new(inner: Arc<dyn Repository<R>>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    /// `find_by_id` 调用次数
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: Record> Repository<R> for CountingRepository<R> {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<R>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn create(&self, entity: &R) -> AppResult<R> {
        self.inner.create(entity).await
    }

    async fn update(&self, entity: &R) -> AppResult<()> {
        self.inner.update(entity).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.inner.delete(id).await
    }
}
