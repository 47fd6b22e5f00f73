//! 停止顺序排序器
//!
//! 在"提供方 -> 依赖方"方向上做 Tarjan 强连通分量遍历，按后序输出：
//! 一个模块只有在所有（直接或间接）依赖它的模块都输出之后才会输出。
//! 发现强连通分量（循环）时，整个分量作为连续的一段输出，
//! 段内顺序由 [`sort_cycle`] 决定。
//!
//! 遍历使用显式工作栈而非函数递归，模块数量很大时也不会耗尽调用栈。
//!
//! # 示例
//!
//! ```rust
//! use chips_shutdown::compute_shutdown_order;
//! use chips_shutdown::module::{Module, ServicePublication};
//!
//! // p2 使用 p1 的服务，p3 使用 p2 的服务
//! let modules = vec![
//!     Module::new(1, "p1").with_publication(ServicePublication::managed(1).bound_to(2)),
//!     Module::new(2, "p2").with_publication(ServicePublication::managed(2).bound_to(3)),
//!     Module::new(3, "p3"),
//! ];
//!
//! let order: Vec<u64> = compute_shutdown_order(&modules).iter().map(|m| m.id.0).collect();
//! assert_eq!(order, vec![3, 2, 1]);
//! ```

use super::dependency::DependencyGraph;
use super::metadata::{Module, ModuleId};
use super::ordering::sort_cycle;

/// 计算出的停止顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownOrder<'a> {
    /// 按停止先后排列的模块，每个输入模块恰好出现一次
    pub modules: Vec<&'a Module>,
    /// 检测到的循环（成员数大于 1 的强连通分量），成员按段内停止顺序排列
    pub cycles: Vec<Vec<ModuleId>>,
}

impl<'a> ShutdownOrder<'a> {
    /// 停止顺序中的模块 ID
    pub fn ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| m.id).collect()
    }

    /// 是否检测到循环依赖
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// 模块数量
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// 计算停止顺序
///
/// 纯函数：同一快照总是得到同一结果，与输入顺序无关。
/// 调用方应按返回顺序逐个停止模块，依赖方最先停止。
pub fn compute_shutdown_order(modules: &[Module]) -> Vec<&Module> {
    sort_for_shutdown(modules).modules
}

/// 计算停止顺序，同时返回检测到的循环
pub fn sort_for_shutdown(modules: &[Module]) -> ShutdownOrder<'_> {
    let graph = DependencyGraph::build(modules);
    TarjanWalk::new(&graph).run()
}

const UNVISITED: usize = usize::MAX;

/// 工作栈帧：当前节点与下一条待检查的出边
struct Frame {
    node: usize,
    cursor: usize,
}

struct TarjanWalk<'g, 'a> {
    graph: &'g DependencyGraph<'a>,
    index: Vec<usize>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    order: ShutdownOrder<'a>,
}

impl<'g, 'a> TarjanWalk<'g, 'a> {
    fn new(graph: &'g DependencyGraph<'a>) -> Self {
        let n = graph.len();
        Self {
            graph,
            index: vec![UNVISITED; n],
            low_link: vec![UNVISITED; n],
            on_stack: vec![false; n],
            stack: Vec::with_capacity(n),
            next_index: 0,
            order: ShutdownOrder {
                modules: Vec::with_capacity(n),
                cycles: Vec::new(),
            },
        }
    }

    fn run(mut self) -> ShutdownOrder<'a> {
        for root in 0..self.graph.len() {
            if self.index[root] == UNVISITED {
                self.visit(root);
            }
        }

        debug_assert_eq!(self.order.modules.len(), self.graph.len());
        self.order
    }

    fn discover(&mut self, node: usize) {
        self.index[node] = self.next_index;
        self.low_link[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }

    fn visit(&mut self, root: usize) {
        let graph = self.graph;
        let mut work = vec![Frame { node: root, cursor: 0 }];
        self.discover(root);

        while let Some(frame) = work.last_mut() {
            let node = frame.node;

            if let Some(&next) = graph.dependents_of(node).get(frame.cursor) {
                frame.cursor += 1;
                if self.index[next] == UNVISITED {
                    self.discover(next);
                    work.push(Frame { node: next, cursor: 0 });
                } else if self.on_stack[next] {
                    self.low_link[node] = self.low_link[node].min(self.index[next]);
                }
                continue;
            }

            work.pop();
            if let Some(parent) = work.last() {
                let parent = parent.node;
                self.low_link[parent] = self.low_link[parent].min(self.low_link[node]);
            }

            if self.low_link[node] == self.index[node] {
                self.emit_component(node);
            }
        }
    }

    /// 弹出以 `root` 为根的强连通分量并输出
    fn emit_component(&mut self, root: usize) {
        let graph = self.graph;
        let mut members = Vec::new();

        while let Some(node) = self.stack.pop() {
            self.on_stack[node] = false;
            members.push(graph.module(node));
            if node == root {
                break;
            }
        }

        if members.len() > 1 {
            sort_cycle(&mut members);
            let cycle: Vec<ModuleId> = members.iter().map(|m| m.id).collect();
            tracing::debug!(members = ?cycle, "检测到循环依赖，按服务排名决定段内停止顺序");
            self.order.cycles.push(cycle);
        }

        self.order.modules.extend(members);
    }
}
