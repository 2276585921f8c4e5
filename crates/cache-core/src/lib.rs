//! aside-cache-core - 缓存旁路（Cache-Aside）策略引擎
//!
//! - `CacheStrategy`: 单一缓存策略抽象，按配置在固定 TTL / 随机 TTL / 空值缓存 / 布隆过滤器之间切换
//! - `LookupService`: 编排缓存与数据仓储，处理命中、未命中、空值命中和写路径的缓存维护
//! - `with_lock`: 基于分布式锁的跨进程临界区

pub mod expiry;
pub mod key;
pub mod lock;
pub mod model;
pub mod service;
pub mod strategy;

pub use expiry::ExpiryPolicy;
pub use key::{ABSENT_MARKER, CacheKeys};
pub use lock::{lock_retry_config, with_lock};
pub use model::{Record, User, decode, encode};
pub use service::LookupService;
pub use strategy::{CacheLookup, CacheStrategy};

#[cfg(test)]
mod mocks;
