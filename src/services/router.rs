//! Congestion-aware shortest-path routing
//!
//! Binary-heap Dijkstra over the venue graph. Edge costs are not static:
//! traversing into node `n` costs `base_distance * factor(density of n's
//! zone)`, resolved from one snapshot taken at query start. The snapshot is
//! never re-read mid-search, so a worker publishing during the query cannot
//! make the accumulated costs incoherent. Routes are recomputed per query,
//! O(E log V); caching would go stale as workers publish.

use crate::domain::graph::VenueGraph;
use crate::domain::types::{DensityLevel, NodeId};
use crate::services::snapshot::{DensitySnapshot, SnapshotStore};
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Converts a density level to a multiplicative edge-cost factor
///
/// Absence of data (no sample yet, node without a zone) is costed as
/// `Normal`; missing information never blocks routing.
pub struct CongestionCostModel;

impl CongestionCostModel {
    pub fn factor(level: DensityLevel) -> f64 {
        match level {
            DensityLevel::Normal => 1.0,
            DensityLevel::High => 5.0,
            DensityLevel::Critical => 20.0,
        }
    }
}

/// Ordered node sequence from start to end with its congestion-weighted cost
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub total_cost: f64,
}

/// Invalid routing input, distinct from "no path exists"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    UnknownNode(NodeId),
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::UnknownNode(node) => write!(f, "unknown node {node}"),
        }
    }
}

impl std::error::Error for RouteError {}

/// Frontier entry for the priority queue
///
/// Ordered by cost (`f64::total_cmp`), then node id so the ordering is
/// total. Ties in cost are broken arbitrarily as far as callers care.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost).is_eq() && self.node == other.node
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cost.total_cmp(&other.cost).then_with(|| self.node.cmp(&other.node))
    }
}

/// Shortest-path search over live density snapshots
pub struct PathFinder {
    graph: Arc<VenueGraph>,
    store: Arc<SnapshotStore>,
}

impl PathFinder {
    pub fn new(graph: Arc<VenueGraph>, store: Arc<SnapshotStore>) -> Self {
        Self { graph, store }
    }

    /// Compute the lowest-cost route under current densities
    ///
    /// Takes one consistent snapshot of all zones at call start. `Ok(None)`
    /// means the destination is unreachable.
    pub fn route(&self, start: NodeId, end: NodeId) -> Result<Option<Route>, RouteError> {
        let snapshot = self.store.read_all();
        find_path(&self.graph, &snapshot, start, end)
    }
}

/// Dijkstra search with congestion-weighted edges against a fixed snapshot
pub fn find_path(
    graph: &VenueGraph,
    snapshot: &DensitySnapshot,
    start: NodeId,
    end: NodeId,
) -> Result<Option<Route>, RouteError> {
    if !graph.contains(start) {
        return Err(RouteError::UnknownNode(start));
    }
    if !graph.contains(end) {
        return Err(RouteError::UnknownNode(end));
    }

    let mut best: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut prev: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut queue: BinaryHeap<Reverse<Frontier>> = BinaryHeap::new();

    best.insert(start, 0.0);
    queue.push(Reverse(Frontier { cost: 0.0, node: start }));

    while let Some(Reverse(Frontier { cost, node })) = queue.pop() {
        // Stale entry from an earlier relaxation
        if cost > best.get(&node).copied().unwrap_or(f64::INFINITY) {
            continue;
        }

        if node == end {
            return Ok(Some(reconstruct(&prev, start, end, cost)));
        }

        for &(neighbor, base_distance) in graph.neighbors(node) {
            let level = graph
                .zone_of(neighbor)
                .and_then(|zone| snapshot.level(zone))
                .unwrap_or(DensityLevel::Normal);
            let next_cost = cost + base_distance * CongestionCostModel::factor(level);

            if next_cost < best.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                best.insert(neighbor, next_cost);
                prev.insert(neighbor, node);
                queue.push(Reverse(Frontier { cost: next_cost, node: neighbor }));
            }
        }
    }

    Ok(None)
}

fn reconstruct(prev: &FxHashMap<NodeId, NodeId>, start: NodeId, end: NodeId, cost: f64) -> Route {
    let mut nodes = vec![end];
    let mut current = end;
    while current != start {
        match prev.get(&current) {
            Some(&p) => {
                nodes.push(p);
                current = p;
            }
            // Unreachable: every popped node except start has a prev entry
            None => break,
        }
    }
    nodes.reverse();
    Route { nodes, total_cost: cost }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DensitySample, ZoneId};
    use chrono::Utc;

    /// The venue topology the defaults ship with: six nodes, three
    /// monitored zones on nodes 1, 2 and 4.
    fn demo_graph() -> VenueGraph {
        let nodes: Vec<NodeId> = (0..6).map(NodeId).collect();
        let edges = [
            (NodeId(0), NodeId(1), 10.0),
            (NodeId(0), NodeId(2), 5.0),
            (NodeId(1), NodeId(3), 8.0),
            (NodeId(1), NodeId(4), 15.0),
            (NodeId(2), NodeId(3), 12.0),
            (NodeId(3), NodeId(5), 7.0),
            (NodeId(4), NodeId(5), 6.0),
        ];
        let zones = [
            (NodeId(1), ZoneId(0)),
            (NodeId(2), ZoneId(1)),
            (NodeId(4), ZoneId(2)),
        ];
        VenueGraph::new(&nodes, &edges, &zones).unwrap()
    }

    fn sample(level: DensityLevel) -> Arc<DensitySample> {
        Arc::new(DensitySample {
            level,
            message: String::new(),
            advisory: None,
            subject_count: 0,
            regions: Vec::new(),
            captured_at: Utc::now(),
        })
    }

    fn snapshot(levels: &[(u32, DensityLevel)]) -> DensitySnapshot {
        levels.iter().map(|&(z, level)| (ZoneId(z), sample(level))).collect()
    }

    fn path(route: &Route) -> Vec<u32> {
        route.nodes.iter().map(|n| n.0).collect()
    }

    #[test]
    fn test_factor_table() {
        assert_eq!(CongestionCostModel::factor(DensityLevel::Normal), 1.0);
        assert_eq!(CongestionCostModel::factor(DensityLevel::High), 5.0);
        assert_eq!(CongestionCostModel::factor(DensityLevel::Critical), 20.0);
    }

    #[test]
    fn test_factor_strictly_increasing() {
        let normal = CongestionCostModel::factor(DensityLevel::Normal);
        let high = CongestionCostModel::factor(DensityLevel::High);
        let critical = CongestionCostModel::factor(DensityLevel::Critical);
        assert!(normal < high && high < critical);
    }

    #[test]
    fn test_all_normal_takes_shortest_base_path() {
        let graph = demo_graph();
        let snap = snapshot(&[
            (0, DensityLevel::Normal),
            (1, DensityLevel::Normal),
            (2, DensityLevel::Normal),
        ]);

        let route = find_path(&graph, &snap, NodeId(0), NodeId(5)).unwrap().unwrap();
        assert_eq!(path(&route), [0, 2, 3, 5]);
        assert_eq!(route.total_cost, 24.0);
    }

    #[test]
    fn test_empty_snapshot_costs_as_normal() {
        let graph = demo_graph();
        let route =
            find_path(&graph, &DensitySnapshot::default(), NodeId(0), NodeId(5)).unwrap().unwrap();
        assert_eq!(path(&route), [0, 2, 3, 5]);
        assert_eq!(route.total_cost, 24.0);
    }

    #[test]
    fn test_high_zone_diverts_route() {
        let graph = demo_graph();
        // Node 2's zone goes High: entering node 2 now costs 5*5=25, so
        // 0-2-3-5 totals 25+12+7=44 while 0-1-3-5 stays at 10+8+7=25.
        let snap = snapshot(&[
            (0, DensityLevel::Normal),
            (1, DensityLevel::High),
            (2, DensityLevel::Normal),
        ]);

        let route = find_path(&graph, &snap, NodeId(0), NodeId(5)).unwrap().unwrap();
        assert_eq!(path(&route), [0, 1, 3, 5]);
        assert_eq!(route.total_cost, 25.0);
    }

    #[test]
    fn test_cost_never_decreases_when_density_rises() {
        let graph = demo_graph();
        let before = find_path(
            &graph,
            &snapshot(&[(1, DensityLevel::Normal)]),
            NodeId(0),
            NodeId(5),
        )
        .unwrap()
        .unwrap();
        let after = find_path(
            &graph,
            &snapshot(&[(1, DensityLevel::High)]),
            NodeId(0),
            NodeId(5),
        )
        .unwrap()
        .unwrap();
        assert!(after.total_cost >= before.total_cost);
    }

    #[test]
    fn test_idempotent_for_same_snapshot() {
        let graph = demo_graph();
        let snap = snapshot(&[(1, DensityLevel::High), (2, DensityLevel::Critical)]);

        let first = find_path(&graph, &snap, NodeId(0), NodeId(5)).unwrap().unwrap();
        let second = find_path(&graph, &snap, NodeId(0), NodeId(5)).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_start_equals_end() {
        let graph = demo_graph();
        let route =
            find_path(&graph, &DensitySnapshot::default(), NodeId(3), NodeId(3)).unwrap().unwrap();
        assert_eq!(path(&route), [3]);
        assert_eq!(route.total_cost, 0.0);
    }

    #[test]
    fn test_unreachable_is_none_not_error() {
        let nodes: Vec<NodeId> = (0..4).map(NodeId).collect();
        let edges = [(NodeId(0), NodeId(1), 1.0), (NodeId(2), NodeId(3), 1.0)];
        let graph = VenueGraph::new(&nodes, &edges, &[]).unwrap();

        let result = find_path(&graph, &DensitySnapshot::default(), NodeId(0), NodeId(3)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unknown_node_is_distinct_error() {
        let graph = demo_graph();
        let err = find_path(&graph, &DensitySnapshot::default(), NodeId(0), NodeId(99));
        assert_eq!(err, Err(RouteError::UnknownNode(NodeId(99))));

        let err = find_path(&graph, &DensitySnapshot::default(), NodeId(42), NodeId(5));
        assert_eq!(err, Err(RouteError::UnknownNode(NodeId(42))));
    }

    #[test]
    fn test_critical_factor_applies() {
        let graph = demo_graph();
        // Critical on node 2's zone makes entering it cost 5*20=100
        let snap = snapshot(&[(1, DensityLevel::Critical)]);
        let route = find_path(&graph, &snap, NodeId(0), NodeId(5)).unwrap().unwrap();
        assert_eq!(path(&route), [0, 1, 3, 5]);
    }
}
