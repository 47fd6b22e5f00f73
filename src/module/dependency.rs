//! 模块依赖关系图
//!
//! 根据模块快照构建"依赖于"关系：若模块 P 的某个托管发布被模块 C 绑定，
//! 则 C 依赖 P（边 C -> P）。同一对模块间的多个共享发布只产生一条边，
//! 非托管发布不产生边，模块绑定自身的发布也不产生边。
//!
//! # 示例
//!
//! ```rust
//! use chips_shutdown::module::dependency::DependencyGraph;
//! use chips_shutdown::module::{Module, ModuleId, ServicePublication};
//!
//! let modules = vec![
//!     Module::new(1, "base").with_publication(ServicePublication::managed(1).bound_to(2)),
//!     Module::new(2, "app"),
//! ];
//!
//! let graph = DependencyGraph::build(&modules);
//! assert!(graph.depends_on(ModuleId(2), ModuleId(1)));
//! assert_eq!(graph.get_dependents(ModuleId(1)), vec![ModuleId(2)]);
//! ```

use std::collections::HashMap;

use super::metadata::{Module, ModuleId};

/// 模块依赖关系图
///
/// 节点按 `ModuleId` 升序存放（规范顺序），邻接表同样升序，
/// 因此同一组模块无论以何种顺序传入，得到的图完全相同。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph<'a> {
    /// 规范顺序的模块
    modules: Vec<&'a Module>,
    /// 提供方 -> 依赖它的模块
    dependents: Vec<Vec<usize>>,
    /// 使用方 -> 它依赖的模块
    dependencies: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// 逐对检查构建依赖图
    ///
    /// 对每一对 (C, P) 检查 P 的托管发布是否被 C 绑定，复杂度 O(N²)。
    pub fn build(modules: &'a [Module]) -> Self {
        let mut graph = Self::empty(modules);
        let n = graph.modules.len();

        for provider in 0..n {
            for consumer in 0..n {
                if consumer != provider
                    && graph.modules[provider].serves(graph.modules[consumer].id)
                {
                    graph.add_edge(consumer, provider);
                }
            }
        }

        tracing::trace!(
            modules = n,
            edges = graph.edge_count(),
            "依赖图构建完成"
        );
        graph
    }

    /// 基于索引构建依赖图
    ///
    /// 先建立 模块 ID -> 节点 的索引，再遍历每个托管发布的绑定集合，
    /// 复杂度 O(N + E)。结果与 [`DependencyGraph::build`] 完全一致。
    pub fn build_indexed(modules: &'a [Module]) -> Self {
        let mut graph = Self::empty(modules);
        let index: HashMap<ModuleId, usize> = graph
            .modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();

        for provider in 0..graph.modules.len() {
            let mut consumers: Vec<usize> = graph.modules[provider]
                .managed_publications()
                .flat_map(|p| p.bound_modules.iter())
                .filter_map(|id| index.get(id).copied())
                .filter(|&consumer| consumer != provider)
                .collect();
            consumers.sort_unstable();
            consumers.dedup();

            for consumer in consumers {
                graph.add_edge(consumer, provider);
            }
        }

        // 按提供方顺序插入后，dependencies 的每个列表天然有序；
        // dependents 由 consumers 排序保证有序
        graph
    }

    fn empty(modules: &'a [Module]) -> Self {
        let mut ordered: Vec<&'a Module> = modules.iter().collect();
        ordered.sort_by_key(|m| m.id);
        let n = ordered.len();

        Self {
            modules: ordered,
            dependents: vec![Vec::new(); n],
            dependencies: vec![Vec::new(); n],
        }
    }

    fn add_edge(&mut self, consumer: usize, provider: usize) {
        self.dependents[provider].push(consumer);
        self.dependencies[consumer].push(provider);
    }

    /// 模块数量
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// 图是否为空
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 边的数量
    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(Vec::len).sum()
    }

    /// 规范顺序下第 `index` 个模块
    pub fn module(&self, index: usize) -> &'a Module {
        self.modules[index]
    }

    /// 规范顺序的全部模块
    pub fn modules(&self) -> &[&'a Module] {
        &self.modules
    }

    /// 模块 ID 对应的节点下标
    pub fn index_of(&self, id: ModuleId) -> Option<usize> {
        self.modules.binary_search_by_key(&id, |m| m.id).ok()
    }

    /// 检查是否包含指定模块
    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.index_of(id).is_some()
    }

    /// 依赖节点 `index` 的节点（升序）
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// 节点 `index` 依赖的节点（升序）
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.dependencies[index]
    }

    /// `consumer` 是否直接依赖 `provider`
    pub fn depends_on(&self, consumer: ModuleId, provider: ModuleId) -> bool {
        match (self.index_of(consumer), self.index_of(provider)) {
            (Some(c), Some(p)) => self.dependencies[c].binary_search(&p).is_ok(),
            _ => false,
        }
    }

    /// 直接依赖指定模块的模块 ID 列表
    pub fn get_dependents(&self, id: ModuleId) -> Vec<ModuleId> {
        self.index_of(id)
            .map(|i| self.ids(&self.dependents[i]))
            .unwrap_or_default()
    }

    /// 指定模块直接依赖的模块 ID 列表
    pub fn get_dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        self.index_of(id)
            .map(|i| self.ids(&self.dependencies[i]))
            .unwrap_or_default()
    }

    fn ids(&self, indices: &[usize]) -> Vec<ModuleId> {
        indices.iter().map(|&i| self.modules[i].id).collect()
    }
}
