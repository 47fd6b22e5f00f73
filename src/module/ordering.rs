//! 循环内排序规则
//!
//! 当若干模块互相依赖（位于同一强连通分量）时，拓扑关系无法决定先后，
//! 此时按模块自身托管发布的元数据排序，依次比较：
//!
//! 1. 自身排名（托管发布的最高排名）：没有托管发布的模块最先停止，
//!    否则排名低的先停止；
//! 2. 自身最大发布 ID：ID 大（最近发布）的先停止；
//! 3. 模块 ID：ID 大的先停止，ID 最小的最后停止。
//!
//! 只检查模块自身发布的服务，不检查它所绑定的服务。

use std::cmp::{Ordering, Reverse};

use super::metadata::{Module, ModuleId, PublicationId};

/// 循环内排序键
///
/// 字段顺序即比较优先级，按键升序排列即为停止顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleRank {
    own_rank: Option<i32>,
    newest_publication: Reverse<Option<PublicationId>>,
    identity: Reverse<ModuleId>,
}

impl CycleRank {
    /// 计算模块的排序键
    pub fn of(module: &Module) -> Self {
        Self {
            own_rank: module.own_rank(),
            newest_publication: Reverse(module.own_max_id()),
            identity: Reverse(module.id),
        }
    }
}

/// 比较同一循环内的两个模块，`Less` 表示 `a` 先停止
pub fn compare_in_cycle(a: &Module, b: &Module) -> Ordering {
    CycleRank::of(a).cmp(&CycleRank::of(b))
}

/// 将同一循环内的模块按停止顺序排列
pub fn sort_cycle(members: &mut [&Module]) {
    members.sort_by_cached_key(|m| CycleRank::of(m));
}
