//! 停止协调器
//!
//! 按计算出的停止顺序逐个停止模块：同一时刻只停止一个模块，
//! 前一个模块的停止结束后才开始下一个。

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::metadata::{Module, ModuleId, ModuleState};
use super::registry::ServiceRegistry;
use super::sorter::sort_for_shutdown;
use crate::core::config::ShutdownConfig;
use crate::utils::{CoreError, Result};

/// 模块停止钩子
///
/// 由宿主实现，负责真正停止一个模块（销毁上下文、释放资源等）。
#[async_trait]
pub trait ModuleStopper: Send + Sync {
    /// 停止模块
    async fn stop_module(&self, module: &Module) -> anyhow::Result<()>;
}

/// 单个模块的停止结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// 已停止
    Stopped,
    /// 停止钩子返回错误
    Failed(String),
    /// 停止超时
    TimedOut,
    /// 因前面的失败而未尝试停止
    Skipped,
}

impl StopOutcome {
    /// 是否成功停止
    pub fn is_stopped(&self) -> bool {
        matches!(self, StopOutcome::Stopped)
    }
}

/// 单个模块的停止记录
#[derive(Debug, Clone)]
pub struct StopRecord {
    /// 模块 ID
    pub module_id: ModuleId,
    /// 模块名
    pub name: String,
    /// 停止结果
    pub outcome: StopOutcome,
    /// 完成时间
    pub finished_at: DateTime<Utc>,
    /// 耗时（毫秒）
    pub duration_ms: u64,
}

/// 停止报告
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// 按停止顺序排列的记录
    pub records: Vec<StopRecord>,
    /// 计算顺序时检测到的循环
    pub cycles: Vec<Vec<ModuleId>>,
}

impl ShutdownReport {
    /// 全部模块是否都已成功停止
    pub fn is_clean(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_stopped())
    }

    /// 实际的停止顺序
    pub fn order(&self) -> Vec<ModuleId> {
        self.records.iter().map(|r| r.module_id).collect()
    }

    /// 未成功停止的模块
    pub fn failures(&self) -> Vec<&StopRecord> {
        self.records
            .iter()
            .filter(|r| !r.outcome.is_stopped())
            .collect()
    }
}

/// 停止协调器
pub struct ShutdownCoordinator {
    registry: ServiceRegistry,
    config: ShutdownConfig,
}

impl ShutdownCoordinator {
    /// 创建停止协调器
    pub fn new(registry: ServiceRegistry, config: ShutdownConfig) -> Self {
        Self { registry, config }
    }

    /// 使用默认配置创建
    pub fn with_defaults(registry: ServiceRegistry) -> Self {
        Self::new(registry, ShutdownConfig::default())
    }

    /// 配置
    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// 预览停止顺序，不停止任何模块
    pub async fn preview(&self) -> Vec<ModuleId> {
        let snapshot = self.registry.snapshot().await;
        sort_for_shutdown(&snapshot).ids()
    }

    /// 按停止顺序停止当前全部运行中的模块
    ///
    /// # Errors
    ///
    /// 只有注册表在停止过程中丢失模块时才返回错误；
    /// 模块停止失败或超时记录在报告中。
    pub async fn shutdown(&self, stopper: &dyn ModuleStopper) -> Result<ShutdownReport> {
        let snapshot = self.registry.snapshot().await;
        let order = sort_for_shutdown(&snapshot);

        info!(modules = order.len(), cycles = order.cycles.len(), "开始按依赖顺序停止模块");
        for cycle in &order.cycles {
            warn!(members = ?cycle, "存在循环依赖，循环内按服务排名停止");
        }

        let mut report = ShutdownReport {
            records: Vec::with_capacity(order.len()),
            cycles: order.cycles.clone(),
        };
        let mut aborted = false;

        for (position, module) in order.modules.iter().enumerate() {
            if aborted {
                debug!(module_id = %module.id, "跳过模块");
                report.records.push(Self::record(module, StopOutcome::Skipped, 0));
                continue;
            }

            let started = Instant::now();
            let outcome = self.stop_one(module, position, stopper).await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            if !outcome.is_stopped() && self.config.abort_on_failure {
                error!(module_id = %module.id, "模块停止失败，放弃停止剩余模块");
                aborted = true;
            }
            report.records.push(Self::record(module, outcome, duration_ms));
        }

        if report.is_clean() {
            info!(modules = report.records.len(), "全部模块已停止");
        } else {
            warn!(failures = report.failures().len(), "停止流程结束，部分模块未能停止");
        }
        Ok(report)
    }

    async fn stop_one(
        &self,
        module: &Module,
        position: usize,
        stopper: &dyn ModuleStopper,
    ) -> Result<StopOutcome> {
        info!(module_id = %module.id, name = %module.name, position, "停止模块");
        self.registry.set_state(module.id, ModuleState::Stopping).await?;

        let timeout = self.config.stop_timeout();
        let outcome = match tokio::time::timeout(timeout, stopper.stop_module(module)).await {
            Ok(Ok(())) => StopOutcome::Stopped,
            Ok(Err(e)) => {
                let err = CoreError::ModuleStopFailed {
                    module_id: module.id.to_string(),
                    reason: format!("{:#}", e),
                };
                error!(module_id = %module.id, error_code = err.error_code(), error = %err, "模块停止失败");
                StopOutcome::Failed(format!("{:#}", e))
            }
            Err(_) => {
                let err = CoreError::StopTimeout {
                    module_id: module.id.to_string(),
                    timeout_ms: self.config.stop_timeout_ms,
                };
                error!(module_id = %module.id, error_code = err.error_code(), error = %err, "模块停止超时");
                StopOutcome::TimedOut
            }
        };

        if outcome.is_stopped() {
            self.registry.set_state(module.id, ModuleState::Stopped).await?;
            if self.config.withdraw_on_stop {
                self.registry.withdraw_all(module.id).await?;
            }
            debug!(module_id = %module.id, "模块已停止");
        } else {
            self.registry.set_state(module.id, ModuleState::Error).await?;
        }

        Ok(outcome)
    }

    fn record(module: &Module, outcome: StopOutcome, duration_ms: u64) -> StopRecord {
        StopRecord {
            module_id: module.id,
            name: module.name.clone(),
            outcome,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}
