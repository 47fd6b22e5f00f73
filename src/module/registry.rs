//! 服务注册表
//!
//! 记录已安装的模块、它们发布的服务以及服务的绑定关系，
//! 并为停止顺序计算提供一致的快照。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::module::metadata::{Module, ModuleId, ModuleState, PublicationId, ServicePublication};
use crate::utils::{CoreError, Result};

/// 发布服务时的参数
#[derive(Debug, Clone, Default)]
pub struct PublicationSpec {
    /// 服务接口名
    pub interfaces: Vec<String>,
    /// 服务排名
    pub ranking: i32,
    /// 是否由集成层托管
    pub managed: bool,
}

impl PublicationSpec {
    /// 托管服务
    pub fn managed() -> Self {
        Self {
            managed: true,
            ..Default::default()
        }
    }

    /// 非托管服务
    pub fn unmanaged() -> Self {
        Self::default()
    }

    /// 设置排名
    pub fn ranking(mut self, ranking: i32) -> Self {
        self.ranking = ranking;
        self
    }

    /// 添加服务接口名
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

/// 注册表中的模块记录
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// 模块快照（含当前拥有的发布）
    pub module: Module,
    /// 当前状态
    pub state: ModuleState,
    /// 安装时间
    pub installed_at: DateTime<Utc>,
    /// 最近一次状态变更时间
    pub state_changed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegistryState {
    modules: BTreeMap<ModuleId, ModuleRecord>,
    /// 发布 ID -> 提供方模块
    owners: HashMap<PublicationId, ModuleId>,
    /// 最近一次分配的发布 ID
    last_publication_id: u64,
}

impl RegistryState {
    fn record(&self, id: ModuleId) -> Result<&ModuleRecord> {
        self.modules
            .get(&id)
            .ok_or_else(|| CoreError::ModuleNotFound(id.to_string()))
    }

    fn record_mut(&mut self, id: ModuleId) -> Result<&mut ModuleRecord> {
        self.modules
            .get_mut(&id)
            .ok_or_else(|| CoreError::ModuleNotFound(id.to_string()))
    }

    fn publication_mut(&mut self, id: PublicationId) -> Result<&mut ServicePublication> {
        let owner = *self
            .owners
            .get(&id)
            .ok_or(CoreError::PublicationNotFound(id.0))?;
        self.modules
            .get_mut(&owner)
            .and_then(|r| r.module.publications.iter_mut().find(|p| p.id == id))
            .ok_or(CoreError::PublicationNotFound(id.0))
    }
}

/// 服务注册表
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ServiceRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 安装模块，新模块处于 `Running` 状态
    ///
    /// # Errors
    ///
    /// 模块 ID 已存在时返回 `ModuleAlreadyRegistered`
    pub async fn install_module(&self, id: impl Into<ModuleId>, name: impl Into<String>) -> Result<()> {
        let id = id.into();
        let mut state = self.state.write().await;
        if state.modules.contains_key(&id) {
            return Err(CoreError::ModuleAlreadyRegistered(id.to_string()));
        }

        let now = Utc::now();
        let module = Module::new(id, name);
        tracing::debug!(module_id = %id, name = %module.name, "模块已安装");
        state.modules.insert(
            id,
            ModuleRecord {
                module,
                state: ModuleState::Running,
                installed_at: now,
                state_changed_at: now,
            },
        );
        Ok(())
    }

    /// 发布服务
    ///
    /// 返回新分配的发布 ID。ID 从 1 开始严格递增，撤销后也不会复用。
    pub async fn publish(&self, provider: ModuleId, spec: PublicationSpec) -> Result<PublicationId> {
        let mut state = self.state.write().await;
        state.record(provider)?;

        state.last_publication_id += 1;
        let id = PublicationId(state.last_publication_id);
        let publication = ServicePublication {
            id,
            interfaces: spec.interfaces,
            ranking: spec.ranking,
            managed: spec.managed,
            bound_modules: Default::default(),
        };

        state.record_mut(provider)?.module.publications.push(publication);
        state.owners.insert(id, provider);
        tracing::debug!(module_id = %provider, publication_id = %id, managed = spec.managed, "服务已发布");
        Ok(id)
    }

    /// 修改服务排名
    pub async fn set_ranking(&self, publication: PublicationId, ranking: i32) -> Result<()> {
        let mut state = self.state.write().await;
        state.publication_mut(publication)?.ranking = ranking;
        Ok(())
    }

    /// 将使用方绑定到服务
    pub async fn bind(&self, publication: PublicationId, consumer: ModuleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(consumer)?;
        state.publication_mut(publication)?.bound_modules.insert(consumer);
        tracing::trace!(publication_id = %publication, consumer = %consumer, "服务已绑定");
        Ok(())
    }

    /// 解除绑定，返回绑定是否存在
    pub async fn unbind(&self, publication: PublicationId, consumer: ModuleId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.publication_mut(publication)?.bound_modules.remove(&consumer))
    }

    /// 撤销一个服务发布
    pub async fn withdraw(&self, publication: PublicationId) -> Result<()> {
        let mut state = self.state.write().await;
        let owner = state
            .owners
            .remove(&publication)
            .ok_or(CoreError::PublicationNotFound(publication.0))?;
        state
            .record_mut(owner)?
            .module
            .publications
            .retain(|p| p.id != publication);
        Ok(())
    }

    /// 撤销模块拥有的全部服务发布，返回撤销数量
    pub async fn withdraw_all(&self, module: ModuleId) -> Result<usize> {
        let mut state = self.state.write().await;
        let publications = std::mem::take(&mut state.record_mut(module)?.module.publications);
        for publication in &publications {
            state.owners.remove(&publication.id);
        }

        if !publications.is_empty() {
            tracing::debug!(module_id = %module, count = publications.len(), "服务发布已撤销");
        }
        Ok(publications.len())
    }

    /// 卸载模块
    ///
    /// 撤销其全部发布，并从其他服务的绑定集合中移除该模块。
    ///
    /// # Errors
    ///
    /// - 模块不存在
    /// - 模块仍处于运行状态
    pub async fn uninstall_module(&self, id: ModuleId) -> Result<()> {
        let mut state = self.state.write().await;
        let current = state.record(id)?.state;
        if !current.can_uninstall() {
            return Err(CoreError::ModuleUnloadFailed {
                module_id: id.to_string(),
                reason: format!("模块状态 {:?} 不允许卸载，请先停止模块", current),
            });
        }

        if let Some(record) = state.modules.remove(&id) {
            for publication in &record.module.publications {
                state.owners.remove(&publication.id);
            }
        }
        for record in state.modules.values_mut() {
            for publication in &mut record.module.publications {
                publication.bound_modules.remove(&id);
            }
        }

        tracing::debug!(module_id = %id, "模块已卸载");
        Ok(())
    }

    /// 设置模块状态
    pub async fn set_state(&self, id: ModuleId, new_state: ModuleState) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(id)?;
        if record.state != new_state {
            tracing::trace!(module_id = %id, from = ?record.state, to = ?new_state, "模块状态变更");
            record.state = new_state;
            record.state_changed_at = Utc::now();
        }
        Ok(())
    }

    /// 获取模块状态
    pub async fn get_state(&self, id: ModuleId) -> Option<ModuleState> {
        self.state.read().await.modules.get(&id).map(|r| r.state)
    }

    /// 获取模块记录
    pub async fn get_module(&self, id: ModuleId) -> Option<ModuleRecord> {
        self.state.read().await.modules.get(&id).cloned()
    }

    /// 模块是否存在
    pub async fn exists(&self, id: ModuleId) -> bool {
        self.state.read().await.modules.contains_key(&id)
    }

    /// 已安装模块数量
    pub async fn module_count(&self) -> usize {
        self.state.read().await.modules.len()
    }

    /// 当前运行中模块的快照
    ///
    /// 在同一个读锁内复制，得到的快照不受之后的注册表变更影响。
    pub async fn snapshot(&self) -> Vec<Module> {
        self.state
            .read()
            .await
            .modules
            .values()
            .filter(|r| r.state == ModuleState::Running)
            .map(|r| r.module.clone())
            .collect()
    }
}
