//! # Chips Shutdown - 模块停止顺序
//!
//! 根据模块之间正在使用的服务计算安全的停止顺序：
//! 正在使用某个模块服务的模块，必须在提供方消失之前停止。
//! 即使服务使用关系存在循环（A 使用 B 的服务，同时 B 使用 A 的服务），
//! 也能给出确定、可解释的顺序。
//!
//! - **依赖关系图**: 由托管服务的绑定关系推导"依赖于"关系
//! - **停止顺序排序器**: Tarjan 强连通分量遍历，依赖方先于提供方输出
//! - **循环内排序**: 按服务排名与发布 ID 决定循环成员的先后
//! - **服务注册表**: 记录模块、服务发布与绑定关系，提供一致快照
//! - **停止协调器**: 按计算出的顺序逐个停止模块
//!
//! ## 快速开始
//!
//! ```rust
//! use chips_shutdown::{compute_shutdown_order, Module, ServicePublication};
//!
//! // web 使用 db 的服务
//! let modules = vec![
//!     Module::new(1, "db").with_publication(ServicePublication::managed(1).bound_to(2)),
//!     Module::new(2, "web"),
//! ];
//!
//! let order: Vec<&str> = compute_shutdown_order(&modules)
//!     .iter()
//!     .map(|m| m.name.as_str())
//!     .collect();
//! assert_eq!(order, vec!["web", "db"]);
//! ```
//!
//! ## 模块结构
//!
//! - `module` - 数据模型、注册表、依赖图、排序与停止协调
//! - `core` - 配置
//! - `utils` - 错误类型与日志系统

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod module;
pub mod utils;

// 重导出常用类型，方便使用
pub use module::{
    compute_shutdown_order, sort_for_shutdown, DependencyGraph, Module, ModuleId, ModuleState,
    ModuleStopper, PublicationId, PublicationSpec, ServicePublication, ServiceRegistry,
    ShutdownCoordinator, ShutdownOrder, ShutdownReport, StopOutcome,
};

pub use utils::{error_code, CoreError, Result};
pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use crate::core::config::{CoreConfig, CoreConfigBuilder, LogConfig, ShutdownConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
