//! 停止顺序集成测试
//!
//! 覆盖链式、森林、循环等典型场景，以及排列、优先关系、输入顺序无关等性质。

use std::collections::{BTreeSet, HashMap};

use chips_shutdown::{compute_shutdown_order, sort_for_shutdown, Module, ModuleId, ServicePublication};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// ============================================================================
// 测试辅助
// ============================================================================

/// 按 (使用方, 提供方) 边构造模块，每个模块拥有一个托管发布
///
/// 模块 i 的发布 ID 为 `publication_ids[i]`，排名为 `rankings[i]`。
fn build_modules(
    ids: &[u64],
    publication_ids: &[u64],
    rankings: &[i32],
    edges: &[(usize, usize)],
) -> Vec<Module> {
    let mut publications: Vec<ServicePublication> = publication_ids
        .iter()
        .zip(rankings)
        .map(|(&p, &r)| ServicePublication::managed(p).with_ranking(r))
        .collect();

    for &(consumer, provider) in edges {
        publications[provider] = publications[provider].clone().bound_to(ids[consumer]);
    }

    ids.iter()
        .zip(publications)
        .map(|(&id, p)| Module::new(id, format!("P{}", id)).with_publication(p))
        .collect()
}

fn order_ids(modules: &[Module]) -> Vec<u64> {
    compute_shutdown_order(modules).iter().map(|m| m.id.0).collect()
}

fn position(order: &[u64], id: u64) -> usize {
    order
        .iter()
        .position(|&x| x == id)
        .unwrap_or_else(|| panic!("module {} missing from order {:?}", id, order))
}

/// 用 petgraph 独立计算强连通分量，返回 模块 ID -> 分量编号
fn scc_membership(modules: &[Module]) -> HashMap<u64, usize> {
    let mut graph = DiGraph::<u64, ()>::new();
    let nodes: HashMap<u64, NodeIndex> = modules
        .iter()
        .map(|m| (m.id.0, graph.add_node(m.id.0)))
        .collect();

    for provider in modules {
        for consumer in modules {
            if consumer.id != provider.id && provider.serves(consumer.id) {
                graph.add_edge(nodes[&consumer.id.0], nodes[&provider.id.0], ());
            }
        }
    }

    let mut membership = HashMap::new();
    for (component, members) in tarjan_scc(&graph).into_iter().enumerate() {
        for node in members {
            membership.insert(graph[node], component);
        }
    }
    membership
}

// ============================================================================
// 典型场景
// ============================================================================

/// P2 使用 P1 的服务，P3 使用 P2 的服务
#[test]
fn test_chain_scenario() {
    let modules = build_modules(&[1, 2, 3], &[1, 2, 3], &[0, 0, 0], &[(1, 0), (2, 1)]);
    assert_eq!(order_ids(&modules), vec![3, 2, 1]);
}

/// 两条互不相连的链 A -> B 与 C -> D
#[test]
fn test_forest_scenario() {
    // A=10, B=20, C=30, D=40；A 依赖 B，C 依赖 D
    let modules = build_modules(&[10, 20, 30, 40], &[1, 2, 3, 4], &[0; 4], &[(0, 1), (2, 3)]);
    let order = order_ids(&modules);

    assert_eq!(order.len(), 4);
    assert!(position(&order, 10) < position(&order, 20));
    assert!(position(&order, 30) < position(&order, 40));
}

/// P1 -> P2 -> P3 -> P4 -> P5 -> P1，排名相同，发布 ID 递增
#[test]
fn test_five_cycle_scenario() {
    let edges = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)];
    let modules = build_modules(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5], &[0; 5], &edges);

    let order = sort_for_shutdown(&modules);
    let ids: Vec<u64> = order.ids().iter().map(|id| id.0).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    assert_eq!(order.cycles.len(), 1);
}

/// X 与 Y 互相依赖，X 的排名更高，Y 先停止
#[test]
fn test_two_cycle_rank_tie_break() {
    // X=1 排名 10，Y=2 排名 0
    let modules = build_modules(&[1, 2], &[1, 2], &[10, 0], &[(0, 1), (1, 0)]);
    assert_eq!(order_ids(&modules), vec![2, 1]);

    // 交换排名后顺序随之交换
    let modules = build_modules(&[1, 2], &[1, 2], &[0, 10], &[(0, 1), (1, 0)]);
    assert_eq!(order_ids(&modules), vec![1, 2]);
}

/// X 与 Y 互相依赖且排名相同，发布 ID 较大者先停止
#[test]
fn test_two_cycle_id_tie_break() {
    let modules = build_modules(&[1, 2], &[7, 3], &[4, 4], &[(0, 1), (1, 0)]);
    assert_eq!(order_ids(&modules), vec![1, 2]);

    let modules = build_modules(&[1, 2], &[3, 7], &[4, 4], &[(0, 1), (1, 0)]);
    assert_eq!(order_ids(&modules), vec![2, 1]);
}

/// 循环内取模块自身托管发布中的最高排名，非托管发布的排名不参与比较
#[test]
fn test_cycle_rank_uses_own_managed_publications() {
    // 2 与 3 互相依赖；2 另有一个高排名的非托管发布
    let modules = vec![
        Module::new(2, "b")
            .with_publication(ServicePublication::managed(1).with_ranking(-10).bound_to(3))
            .with_publication(ServicePublication::unmanaged(5).with_ranking(100)),
        Module::new(3, "c").with_publication(ServicePublication::managed(2).bound_to(2)),
        Module::new(4, "bare").with_publication(ServicePublication::unmanaged(3).bound_to(2)),
    ];
    let order = sort_for_shutdown(&modules);

    assert_eq!(order.cycles, vec![vec![ModuleId(2), ModuleId(3)]]);
    assert_eq!(order.ids(), vec![ModuleId(2), ModuleId(3), ModuleId(4)]);
}

/// 非托管发布的使用关系不影响顺序
#[test]
fn test_unmanaged_usage_is_ignored() {
    // 模块 1 的非托管服务被 2 使用；按模块 ID 降序，2 本来就在前，
    // 因此让 2 的托管服务被 1 使用，检验非托管边不会造成循环
    let modules = vec![
        Module::new(1, "a").with_publication(ServicePublication::unmanaged(1).bound_to(2)),
        Module::new(2, "b").with_publication(ServicePublication::managed(2).bound_to(1)),
    ];
    let order = sort_for_shutdown(&modules);
    assert!(!order.has_cycles());
    assert_eq!(order.ids(), vec![ModuleId(1), ModuleId(2)]);
}

/// 从 YAML 快照加载
#[test]
fn test_snapshot_from_yaml() {
    let yaml = r#"
- id: 1
  name: logging
  publications:
    - id: 11
      interfaces: [org.chips.Log]
      managed: true
      bound_modules: [2, 3]
- id: 2
  name: storage
  publications:
    - id: 12
      ranking: 5
      managed: true
      bound_modules: [3]
- id: 3
  name: web
"#;
    let modules: Vec<Module> = serde_yaml::from_str(yaml).unwrap();
    let names: Vec<&str> = compute_shutdown_order(&modules)
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["web", "storage", "logging"]);
}

// ============================================================================
// 输入顺序无关
// ============================================================================

#[test]
fn test_shuffle_invariance() {
    let edges = [
        (0, 1),
        (1, 2),
        (2, 0),
        (3, 0),
        (4, 3),
        (5, 6),
        (6, 5),
        (7, 5),
        (2, 8),
    ];
    let ids: Vec<u64> = (1..=9).collect();
    let modules = build_modules(&ids, &[9, 3, 5, 1, 8, 2, 7, 4, 6], &[0, 1, 0, 2, 0, 3, 3, 0, 1], &edges);
    let expected = order_ids(&modules);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut shuffled = modules.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(order_ids(&shuffled), expected);
    }
}

// ============================================================================
// 性质测试
// ============================================================================

fn arbitrary_snapshot() -> impl Strategy<Value = Vec<Module>> {
    (1usize..12)
        .prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::btree_set(1u64..1000, n),
                prop::collection::btree_set(1u64..1000, n),
                prop::collection::vec(-3i32..3, n),
                prop::collection::vec((0..n, 0..n), 0..(n * 3)),
                prop::collection::vec((0..n, 0..n), 0..n),
            )
        })
        .prop_map(|(n, ids, publication_ids, rankings, edges, unmanaged)| {
            let ids: Vec<u64> = ids.into_iter().collect();
            let publication_ids: Vec<u64> = publication_ids.into_iter().collect();
            let mut modules = build_modules(&ids, &publication_ids, &rankings[..n], &edges);

            // 非托管发布使用 1000 以上的 ID，避免与托管发布冲突
            for (i, &(owner, consumer)) in unmanaged.iter().enumerate() {
                let publication = ServicePublication::unmanaged(1000 + i as u64).bound_to(ids[consumer]);
                modules[owner].publications.push(publication);
            }
            modules
        })
}

proptest! {
    #[test]
    fn prop_output_is_permutation(modules in arbitrary_snapshot()) {
        let order = order_ids(&modules);
        let input: BTreeSet<u64> = modules.iter().map(|m| m.id.0).collect();
        let output: BTreeSet<u64> = order.iter().copied().collect();

        prop_assert_eq!(order.len(), modules.len());
        prop_assert_eq!(input, output);
    }

    #[test]
    fn prop_acyclic_precedence(modules in arbitrary_snapshot()) {
        let order = order_ids(&modules);
        let membership = scc_membership(&modules);

        for provider in &modules {
            for consumer in &modules {
                if consumer.id == provider.id || !provider.serves(consumer.id) {
                    continue;
                }
                if membership[&consumer.id.0] != membership[&provider.id.0] {
                    prop_assert!(
                        position(&order, consumer.id.0) < position(&order, provider.id.0),
                        "{} depends on {} but order is {:?}", consumer.id, provider.id, order
                    );
                }
            }
        }
    }

    #[test]
    fn prop_cycles_match_independent_scc(modules in arbitrary_snapshot()) {
        let order = sort_for_shutdown(&modules);
        let membership = scc_membership(&modules);
        let ids: Vec<u64> = order.ids().iter().map(|id| id.0).collect();

        let mut expected: BTreeSet<BTreeSet<u64>> = BTreeSet::new();
        let mut components: HashMap<usize, BTreeSet<u64>> = HashMap::new();
        for (&id, &component) in &membership {
            components.entry(component).or_default().insert(id);
        }
        for members in components.into_values() {
            if members.len() > 1 {
                expected.insert(members);
            }
        }

        let actual: BTreeSet<BTreeSet<u64>> = order
            .cycles
            .iter()
            .map(|cycle| cycle.iter().map(|id| id.0).collect())
            .collect();
        prop_assert_eq!(&actual, &expected);

        // 每个循环在输出中连续出现
        for cycle in &order.cycles {
            let start = position(&ids, cycle[0].0);
            let segment: Vec<u64> = ids[start..start + cycle.len()].to_vec();
            let members: Vec<u64> = cycle.iter().map(|id| id.0).collect();
            prop_assert_eq!(segment, members);
        }
    }

    #[test]
    fn prop_input_order_does_not_matter(modules in arbitrary_snapshot(), seed in any::<u64>()) {
        let expected = order_ids(&modules);

        let mut shuffled = modules.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(order_ids(&shuffled), expected.clone());

        shuffled.reverse();
        prop_assert_eq!(order_ids(&shuffled), expected);
    }
}
