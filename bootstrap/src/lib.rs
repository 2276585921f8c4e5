//! aside-bootstrap - 启动骨架
//!
//! 日志初始化与 Redis / PostgreSQL 资源的创建

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
