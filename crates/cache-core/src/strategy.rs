//! 缓存策略
//!
//! 四种防护策略共用一套读 / 写 / 删契约：
//! - Plain: 固定过期时间
//! - RandomTtl: 过期时间加随机抖动（防雪崩）
//! - NullMarker: 确认不存在时写入空值标记（防穿透）
//! - BloomGated: 读之前先查布隆过滤器（防穿透）

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use aside_config::{CacheConfig, StrategyKind};
use aside_errors::{AppError, AppResult};
use aside_ports::{BloomMembership, CachePort};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::expiry::ExpiryPolicy;
use crate::key::{ABSENT_MARKER, CacheKeys};
use crate::model::{Record, decode, encode};

const DEFAULT_TTL: Duration = Duration::from_secs(aside_config::DEFAULT_TTL_SECS);
const DEFAULT_NULL_TTL: Duration = Duration::from_secs(60);
const DEFAULT_JITTER_PERCENT: u32 = 10;

/// 缓存读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<R> {
    /// 命中
    Hit(R),
    /// 命中空值标记
    Absent,
    /// 布隆过滤器判定一定不存在，未访问缓存
    Rejected,
    /// 未命中
    Miss,
}

/// 缓存策略
pub struct CacheStrategy<R> {
    kind: StrategyKind,
    store: Arc<dyn CachePort>,
    keys: CacheKeys,
    default_ttl: Duration,
    jitter_percent: u32,
    null_ttl: Duration,
    bloom: Option<Arc<dyn BloomMembership>>,
    rng: Mutex<StdRng>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> CacheStrategy<R> {
    fn with_kind(kind: StrategyKind, store: Arc<dyn CachePort>) -> Self {
        Self {
            kind,
            store,
            keys: CacheKeys::for_record::<R>(),
            default_ttl: DEFAULT_TTL,
            jitter_percent: DEFAULT_JITTER_PERCENT,
            null_ttl: DEFAULT_NULL_TTL,
            bloom: None,
            rng: Mutex::new(StdRng::from_entropy()),
            _record: PhantomData,
        }
    }

    pub fn plain(store: Arc<dyn CachePort>) -> Self {
        Self::with_kind(StrategyKind::Plain, store)
    }

    pub fn random_ttl(store: Arc<dyn CachePort>, jitter_percent: u32) -> Self {
        let mut strategy = Self::with_kind(StrategyKind::RandomTtl, store);
        strategy.jitter_percent = jitter_percent;
        strategy
    }

    pub fn null_marker(store: Arc<dyn CachePort>, null_ttl: Duration) -> Self {
        let mut strategy = Self::with_kind(StrategyKind::NullMarker, store);
        strategy.null_ttl = null_ttl;
        strategy
    }

    pub fn bloom_gated(store: Arc<dyn CachePort>, bloom: Arc<dyn BloomMembership>) -> Self {
        let mut strategy = Self::with_kind(StrategyKind::BloomGated, store);
        strategy.bloom = Some(bloom);
        strategy
    }

    /// 按配置构建
    ///
    /// `bloom_gated` 必须提供布隆过滤器
    pub fn from_config(
        config: &CacheConfig,
        store: Arc<dyn CachePort>,
        bloom: Option<Arc<dyn BloomMembership>>,
    ) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::invalid_argument(e.to_string()))?;

        let mut strategy = Self::with_kind(config.strategy, store)
            .with_keys(CacheKeys::new(config.key_prefix.clone()))
            .with_default_ttl(Duration::from_secs(config.effective_ttl_secs()));
        strategy.jitter_percent = config.jitter_percent;
        strategy.null_ttl = Duration::from_secs(config.null_ttl_secs);

        if config.strategy == StrategyKind::BloomGated {
            let bloom = bloom.ok_or_else(|| {
                AppError::invalid_argument("bloom_gated strategy requires a bloom filter")
            })?;
            strategy.bloom = Some(bloom);
        }

        Ok(strategy)
    }

    pub fn with_keys(mut self, keys: CacheKeys) -> Self {
        self.keys = keys;
        self
    }

    /// 设置默认过期时间，零值保持原设置
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.default_ttl = ttl;
        }
        self
    }

    /// 注入随机源（测试中使用固定种子）
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub fn null_ttl(&self) -> Duration {
        self.null_ttl
    }

    /// 本次写入采用的过期策略，`ttl` 为空或为零时使用默认值
    pub fn expiry_for(&self, ttl: Option<Duration>) -> ExpiryPolicy {
        let base = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        match self.kind {
            StrategyKind::RandomTtl => ExpiryPolicy::Jittered {
                base,
                percent: self.jitter_percent,
            },
            _ => ExpiryPolicy::Fixed(base),
        }
    }

    /// 读取缓存
    ///
    /// 载荷无法反序列化时返回 `Serialization` 错误，不当作未命中
    pub async fn read(&self, id: i64) -> AppResult<CacheLookup<R>> {
        let key = self.keys.key(id);

        if let Some(bloom) = &self.bloom {
            match bloom.may_exist(key.as_bytes()).await {
                Ok(false) => {
                    debug!(key = %key, "Bloom filter rejected key");
                    return Ok(CacheLookup::Rejected);
                }
                Ok(true) => {}
                // 过滤器不可用时放行，继续查缓存
                Err(e) => warn!(key = %key, error = %e, "Bloom filter check failed, continuing"),
            }
        }

        match self.store.get(&key).await? {
            None => Ok(CacheLookup::Miss),
            Some(value) if value == ABSENT_MARKER => Ok(CacheLookup::Absent),
            Some(value) => decode(&value).map(CacheLookup::Hit),
        }
    }

    /// 写入缓存，返回实际使用的过期时间
    pub async fn write(&self, record: &R, ttl: Option<Duration>) -> AppResult<Duration> {
        if record.id() <= 0 {
            return Err(AppError::invalid_argument(
                "cannot cache a record without an assigned id",
            ));
        }

        let key = self.keys.key(record.id());
        let payload = encode(record)?;
        let expire = {
            let mut rng = self.rng.lock();
            self.expiry_for(ttl).resolve(&mut *rng)
        };

        self.store.set(&key, &payload, Some(expire)).await?;
        debug!(key = %key, expire_secs = expire.as_secs(), "Cache entry written");
        Ok(expire)
    }

    /// 处理「仓储确认不存在」
    ///
    /// 仅 NullMarker 写入空值标记，返回是否写入
    pub async fn mark_absent(&self, id: i64) -> AppResult<bool> {
        if self.kind != StrategyKind::NullMarker {
            return Ok(false);
        }

        let key = self.keys.key(id);
        self.store
            .set(&key, ABSENT_MARKER, Some(self.null_ttl))
            .await?;
        debug!(key = %key, expire_secs = self.null_ttl.as_secs(), "Absent marker written");
        Ok(true)
    }

    /// 删除缓存，键不存在不是错误
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.store.delete(&self.keys.key(id)).await
    }

    /// 登记已确认存在的 id（仅 BloomGated 生效）
    ///
    /// 只能登记确实存在的记录：过滤器不支持删除，登记不存在的 id 只会抬高误判率
    pub async fn register(&self, id: i64) -> AppResult<()> {
        match &self.bloom {
            Some(bloom) => bloom.add(self.keys.key(id).as_bytes()).await,
            None => Ok(()),
        }
    }
}

impl<R> std::fmt::Debug for CacheStrategy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStrategy")
            .field("kind", &self.kind)
            .field("keys", &self.keys)
            .field("default_ttl", &self.default_ttl)
            .field("jitter_percent", &self.jitter_percent)
            .field("null_ttl", &self.null_ttl)
            .field("bloom", &self.bloom.is_some())
            .finish()
    }
}
