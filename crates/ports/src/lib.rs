//! ports - 抽象 trait 层
//!
//! 缓存旁路模式依赖的外部协作方：键值存储、数据仓储、布隆过滤器、分布式锁

mod bloom;
mod cache;
mod lock;
mod repository;

pub use bloom::*;
pub use cache::*;
pub use lock::*;
pub use repository::*;
