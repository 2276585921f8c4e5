//! aside-adapter-redis - Redis 适配器
//!
//! 键值存储、RedisBloom 布隆过滤器、分布式锁以及运维命令

mod admin;
mod bloom_filter;
mod cache;
mod connection;
mod distributed_lock;

pub use admin::*;
pub use bloom_filter::*;
pub use cache::*;
pub use connection::*;
pub use distributed_lock::*;
