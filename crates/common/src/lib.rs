//! aside-common - 通用工具库

pub mod retry;

pub use retry::*;
