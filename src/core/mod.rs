//! 核心模块
//!
//! 包含配置结构与加载逻辑。

pub mod config;

pub use config::{CoreConfig, CoreConfigBuilder, LogConfig, ShutdownConfig};
