//! 模块与服务发布的数据模型
//!
//! 定义停止顺序计算所需的快照数据结构：模块、服务发布以及模块状态。
//! 所有类型均可序列化，便于从 YAML/JSON 快照文件中加载。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 模块标识
///
/// 稳定且可比较，仅在循环内排序的最后一步作为兜底依据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ModuleId {
    fn from(id: u64) -> Self {
        ModuleId(id)
    }
}

/// 服务发布 ID
///
/// 发布时分配，全局唯一且单调递增，永不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub u64);

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 服务发布
///
/// 属于唯一的一个模块。只有 `managed` 为真的发布才参与依赖计算和循环内排序，
/// 非托管发布对停止顺序不可见。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePublication {
    /// 发布 ID
    pub id: PublicationId,

    /// 发布所用的服务接口名
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// 服务排名（越高越优先）
    #[serde(default)]
    pub ranking: i32,

    /// 是否由集成层托管
    #[serde(default)]
    pub managed: bool,

    /// 当前绑定（正在使用）此服务的模块
    #[serde(default)]
    pub bound_modules: BTreeSet<ModuleId>,
}

impl ServicePublication {
    /// 创建一个托管发布，排名为 0，无绑定模块
    pub fn managed(id: u64) -> Self {
        Self {
            id: PublicationId(id),
            interfaces: Vec::new(),
            ranking: 0,
            managed: true,
            bound_modules: BTreeSet::new(),
        }
    }

    /// 创建一个非托管发布
    pub fn unmanaged(id: u64) -> Self {
        Self {
            managed: false,
            ..Self::managed(id)
        }
    }

    /// 设置排名
    pub fn with_ranking(mut self, ranking: i32) -> Self {
        self.ranking = ranking;
        self
    }

    /// 添加服务接口名
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// 添加绑定模块
    pub fn bound_to(mut self, module: impl Into<ModuleId>) -> Self {
        self.bound_modules.insert(module.into());
        self
    }

    /// 是否为托管发布
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// 指定模块是否绑定了此服务
    pub fn is_bound_to(&self, module: ModuleId) -> bool {
        self.bound_modules.contains(&module)
    }
}

/// 模块快照
///
/// 某一时刻模块及其拥有的服务发布。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// 模块 ID
    pub id: ModuleId,

    /// 模块符号名
    #[serde(default)]
    pub name: String,

    /// 模块当前拥有的服务发布
    #[serde(default)]
    pub publications: Vec<ServicePublication>,
}

impl Module {
    /// 创建没有任何发布的模块
    pub fn new(id: impl Into<ModuleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            publications: Vec::new(),
        }
    }

    /// 添加服务发布
    pub fn with_publication(mut self, publication: ServicePublication) -> Self {
        self.publications.push(publication);
        self
    }

    /// 模块自身的托管发布
    pub fn managed_publications(&self) -> impl Iterator<Item = &ServicePublication> {
        self.publications.iter().filter(|p| p.is_managed())
    }

    /// 自身托管发布中的最高排名，没有托管发布时为 `None`
    pub fn own_rank(&self) -> Option<i32> {
        self.managed_publications().map(|p| p.ranking).max()
    }

    /// 自身托管发布中最大的发布 ID，没有托管发布时为 `None`
    pub fn own_max_id(&self) -> Option<PublicationId> {
        self.managed_publications().map(|p| p.id).max()
    }

    /// `consumer` 是否绑定了本模块的任一托管发布
    pub fn serves(&self, consumer: ModuleId) -> bool {
        self.managed_publications().any(|p| p.is_bound_to(consumer))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "#{}", self.id)
        } else {
            write!(f, "{} (#{})", self.name, self.id)
        }
    }
}

/// 模块状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// 运行中
    #[default]
    Running,
    /// 正在停止
    Stopping,
    /// 已停止
    Stopped,
    /// 错误状态
    Error,
}

impl ModuleState {
    /// 是否可以停止
    pub fn can_stop(&self) -> bool {
        matches!(self, ModuleState::Running)
    }

    /// 是否可以卸载
    pub fn can_uninstall(&self) -> bool {
        matches!(self, ModuleState::Stopped | ModuleState::Error)
    }
}
