//! 模块管理模块
//!
//! 包含停止顺序计算的各个组件：
//! - 模块与服务发布的数据模型
//! - 服务注册表（快照来源）
//! - 依赖关系图
//! - 循环内排序规则
//! - 停止顺序排序器
//! - 停止协调器

pub mod dependency;
pub mod lifecycle;
pub mod metadata;
pub mod ordering;
pub mod registry;
pub mod sorter;

// 重导出常用类型
pub use dependency::DependencyGraph;
pub use lifecycle::{ModuleStopper, ShutdownCoordinator, ShutdownReport, StopOutcome, StopRecord};
pub use metadata::{Module, ModuleId, ModuleState, PublicationId, ServicePublication};
pub use ordering::{compare_in_cycle, sort_cycle, CycleRank};
pub use registry::{ModuleRecord, PublicationSpec, ServiceRegistry};
pub use sorter::{compute_shutdown_order, sort_for_shutdown, ShutdownOrder};
