//! Static venue topology
//!
//! The graph is immutable configuration, built once at startup and shared
//! behind an `Arc`. Construction validates every reference: edge endpoints
//! must be declared nodes, distances must be positive, and zone mappings
//! must point at declared nodes. Lookups after construction cannot fail.

use crate::domain::types::{NodeId, ZoneId};
use anyhow::{bail, ensure};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Weighted undirected graph of navigable venue nodes
///
/// A subset of nodes carries camera coverage via a zone mapping; nodes
/// without a zone are costed as `Normal` density by the router.
#[derive(Debug, Clone)]
pub struct VenueGraph {
    adjacency: FxHashMap<NodeId, SmallVec<[(NodeId, f64); 4]>>,
    node_zones: FxHashMap<NodeId, ZoneId>,
}

impl VenueGraph {
    /// Build and validate the graph
    ///
    /// `edges` are undirected `(a, b, base_distance)` triples; both
    /// directions become adjacency entries.
    pub fn new(
        nodes: &[NodeId],
        edges: &[(NodeId, NodeId, f64)],
        zone_map: &[(NodeId, ZoneId)],
    ) -> anyhow::Result<Self> {
        ensure!(!nodes.is_empty(), "graph has no nodes");

        let mut adjacency: FxHashMap<NodeId, SmallVec<[(NodeId, f64); 4]>> =
            FxHashMap::default();
        for &node in nodes {
            if adjacency.insert(node, SmallVec::new()).is_some() {
                bail!("duplicate node {node}");
            }
        }

        for &(a, b, distance) in edges {
            ensure!(adjacency.contains_key(&a), "edge {a}-{b} references unknown node {a}");
            ensure!(adjacency.contains_key(&b), "edge {a}-{b} references unknown node {b}");
            ensure!(a != b, "edge {a}-{b} is a self-loop");
            ensure!(
                distance > 0.0 && distance.is_finite(),
                "edge {a}-{b} has non-positive distance {distance}"
            );
            if let Some(neighbors) = adjacency.get_mut(&a) {
                neighbors.push((b, distance));
            }
            if let Some(neighbors) = adjacency.get_mut(&b) {
                neighbors.push((a, distance));
            }
        }

        let mut node_zones = FxHashMap::default();
        for &(node, zone) in zone_map {
            ensure!(adjacency.contains_key(&node), "zone {zone} mapped to unknown node {node}");
            if node_zones.insert(node, zone).is_some() {
                bail!("node {node} mapped to more than one zone");
            }
        }

        Ok(Self { adjacency, node_zones })
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Neighbors of `node` as `(node, base_distance)` pairs
    ///
    /// Unknown nodes read as empty; the router rejects them before searching.
    pub fn neighbors(&self, node: NodeId) -> &[(NodeId, f64)] {
        self.adjacency.get(&node).map(|n| n.as_slice()).unwrap_or(&[])
    }

    /// Monitored zone covering `node`, if any
    #[inline]
    pub fn zone_of(&self, node: NodeId) -> Option<ZoneId> {
        self.node_zones.get(&node).copied()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Zones referenced by the graph's zone mapping
    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.node_zones.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[u32]) -> Vec<NodeId> {
        ids.iter().map(|&i| NodeId(i)).collect()
    }

    #[test]
    fn test_neighbors_bidirectional() {
        let graph = VenueGraph::new(
            &nodes(&[0, 1, 2]),
            &[(NodeId(0), NodeId(1), 10.0), (NodeId(1), NodeId(2), 3.0)],
            &[],
        )
        .unwrap();

        assert_eq!(graph.neighbors(NodeId(0)), &[(NodeId(1), 10.0)]);
        assert_eq!(graph.neighbors(NodeId(1)), &[(NodeId(0), 10.0), (NodeId(2), 3.0)]);
        assert_eq!(graph.neighbors(NodeId(2)), &[(NodeId(1), 3.0)]);
    }

    #[test]
    fn test_zone_of() {
        let graph = VenueGraph::new(
            &nodes(&[0, 1]),
            &[(NodeId(0), NodeId(1), 1.0)],
            &[(NodeId(1), ZoneId(7))],
        )
        .unwrap();

        assert_eq!(graph.zone_of(NodeId(1)), Some(ZoneId(7)));
        assert_eq!(graph.zone_of(NodeId(0)), None);
    }

    #[test]
    fn test_rejects_unknown_edge_endpoint() {
        let err = VenueGraph::new(&nodes(&[0, 1]), &[(NodeId(0), NodeId(9), 1.0)], &[]);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_non_positive_distance() {
        assert!(VenueGraph::new(&nodes(&[0, 1]), &[(NodeId(0), NodeId(1), 0.0)], &[]).is_err());
        assert!(VenueGraph::new(&nodes(&[0, 1]), &[(NodeId(0), NodeId(1), -2.0)], &[]).is_err());
    }

    #[test]
    fn test_rejects_zone_on_unknown_node() {
        let err = VenueGraph::new(&nodes(&[0]), &[], &[(NodeId(5), ZoneId(0))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_duplicate_node() {
        assert!(VenueGraph::new(&nodes(&[0, 0]), &[], &[]).is_err());
    }

    #[test]
    fn test_rejects_self_loop() {
        assert!(VenueGraph::new(&nodes(&[0, 1]), &[(NodeId(0), NodeId(0), 1.0)], &[]).is_err());
    }
}
