//! The base adjacency matrix and graph queries over it.
//!
//! RULE: The engine never mutates a caller's base matrix. Policies and
//! the rewiring process work on owned copies.

use crate::{
    error::{SimError, SimResult},
    types::NodeId,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An undirected edge, stored with the smaller endpoint first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge(pub NodeId, pub NodeId);

impl Edge {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Symmetric N×N weight matrix, no self-loops. A weight of 0 means no edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAdjacency")]
pub struct AdjacencyMatrix {
    n:       usize,
    weights: Vec<f64>,
}

/// Unvalidated wire form, checked like `from_rows`.
#[derive(Deserialize)]
struct RawAdjacency {
    n:       usize,
    weights: Vec<f64>,
}

impl TryFrom<RawAdjacency> for AdjacencyMatrix {
    type Error = SimError;

    fn try_from(raw: RawAdjacency) -> SimResult<Self> {
        if raw.n.checked_mul(raw.n) != Some(raw.weights.len()) {
            return Err(SimError::InvalidArgument(format!(
                "adjacency of {} nodes needs {} weights, got {}",
                raw.n,
                raw.n.saturating_mul(raw.n),
                raw.weights.len()
            )));
        }
        let matrix = Self { n: raw.n, weights: raw.weights };
        matrix.validate()?;
        Ok(matrix)
    }
}

impl AdjacencyMatrix {
    /// N nodes, no edges.
    pub fn empty(n: usize) -> Self {
        Self { n, weights: vec![0.0; n * n] }
    }

    /// Build from dense rows, validating shape, symmetry, weights and self-loops.
    pub fn from_rows(rows: &[Vec<f64>]) -> SimResult<Self> {
        let n = rows.len();
        let mut weights = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SimError::InvalidArgument(format!(
                    "adjacency row {i} has {} entries, expected {n}",
                    row.len()
                )));
            }
            weights.extend_from_slice(row);
        }
        let matrix = Self { n, weights };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Build an unweighted graph (weight 1.0) from an edge list.
    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId)]) -> SimResult<Self> {
        let mut matrix = Self::empty(n);
        for &(u, v) in edges {
            if u >= n || v >= n {
                return Err(SimError::InvalidArgument(format!(
                    "edge ({u}, {v}) references a node outside [0, {n})"
                )));
            }
            if u == v {
                return Err(SimError::InvalidArgument(format!("self-loop at node {u}")));
            }
            matrix.add_edge(u, v);
        }
        Ok(matrix)
    }

    fn validate(&self) -> SimResult<()> {
        for u in 0..self.n {
            if self.weight(u, u) != 0.0 {
                return Err(SimError::InvalidArgument(format!("self-loop at node {u}")));
            }
            for v in u + 1..self.n {
                let w = self.weight(u, v);
                if !w.is_finite() || w < 0.0 {
                    return Err(SimError::InvalidArgument(format!(
                        "edge ({u}, {v}) has invalid weight {w}"
                    )));
                }
                if w != self.weight(v, u) {
                    return Err(SimError::InvalidArgument(format!(
                        "adjacency is not symmetric at ({u}, {v})"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    pub fn weight(&self, u: NodeId, v: NodeId) -> f64 {
        self.weights[u * self.n + v]
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.weight(u, v) > 0.0
    }

    pub fn neighbors(&self, u: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let row = &self.weights[u * self.n..(u + 1) * self.n];
        row.iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(|(v, _)| v)
    }

    pub fn degree(&self, u: NodeId) -> usize {
        self.neighbors(u).count()
    }

    /// Every edge once, in ascending order.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for u in 0..self.n {
            for v in u + 1..self.n {
                if self.has_edge(u, v) {
                    edges.push(Edge(u, v));
                }
            }
        }
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Add (or reset to weight 1.0) the edge u–v. Self-loops are ignored.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        self.set_weight(u, v, 1.0);
    }

    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) {
        self.set_weight(u, v, 0.0);
    }

    fn set_weight(&mut self, u: NodeId, v: NodeId, w: f64) {
        if u == v {
            return;
        }
        self.weights[u * self.n + v] = w;
        self.weights[v * self.n + u] = w;
    }

    /// Keep only the edges present in both matrices, with this matrix's weights.
    pub fn intersect(&self, other: &AdjacencyMatrix) -> SimResult<AdjacencyMatrix> {
        if other.n != self.n {
            return Err(SimError::DimensionMismatch { expected: self.n, actual: other.n });
        }
        let weights = self
            .weights
            .iter()
            .zip(&other.weights)
            .map(|(&a, &b)| if b > 0.0 { a } else { 0.0 })
            .collect();
        Ok(Self { n: self.n, weights })
    }

    /// True when every edge here is also an edge of `base`.
    pub fn is_subgraph_of(&self, base: &AdjacencyMatrix) -> bool {
        self.n == base.n
            && self
                .weights
                .iter()
                .zip(&base.weights)
                .all(|(&w, &b)| w == 0.0 || b > 0.0)
    }

    /// Proportion of shared neighbors between u and v: |N(u) ∩ N(v)| over
    /// |N(u) ∪ N(v)| with u and v themselves left out. 0 when the union is empty.
    pub fn common_neighbor_proportion(&self, u: NodeId, v: NodeId) -> f64 {
        let mut common = 0usize;
        let mut union = 0usize;
        for w in 0..self.n {
            if w == u || w == v {
                continue;
            }
            let in_u = self.has_edge(u, w);
            let in_v = self.has_edge(v, w);
            if in_u && in_v {
                common += 1;
            }
            if in_u || in_v {
                union += 1;
            }
        }
        if union == 0 { 0.0 } else { common as f64 / union as f64 }
    }

    /// BFS hop distance from `source` to every node.
    fn bfs(&self, source: NodeId) -> Vec<Option<u32>> {
        let mut dist = vec![None; self.n];
        let mut queue = VecDeque::new();
        dist[source] = Some(0);
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let next = dist[u].map(|d| d + 1);
            for v in self.neighbors(u) {
                if dist[v].is_none() {
                    dist[v] = next;
                    queue.push_back(v);
                }
            }
        }
        dist
    }

    /// All-pairs hop distances.
    pub fn hop_distances(&self) -> DistanceMatrix {
        let mut dist = Vec::with_capacity(self.n * self.n);
        for source in 0..self.n {
            dist.extend(self.bfs(source));
        }
        DistanceMatrix { n: self.n, dist }
    }

    /// An empty graph counts as connected.
    pub fn is_connected(&self) -> bool {
        self.n == 0 || self.bfs(0).iter().all(Option::is_some)
    }
}

/// Pairwise hop distances; `None` when unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    n:    usize,
    dist: Vec<Option<u32>>,
}

impl DistanceMatrix {
    /// Build from explicit rows (e.g. geometric distances rounded upstream).
    pub fn from_rows(rows: Vec<Vec<Option<u32>>>) -> SimResult<Self> {
        let n = rows.len();
        let mut dist = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(SimError::InvalidArgument(format!(
                    "distance row {i} has {} entries, expected {n}",
                    row.len()
                )));
            }
            dist.extend(row);
        }
        Ok(Self { n, dist })
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    pub fn get(&self, u: NodeId, v: NodeId) -> Option<u32> {
        self.dist[u * self.n + v]
    }

    /// Nodes other than `u` whose distance d satisfies `min < d <= max`.
    pub fn nodes_in_band(&self, u: NodeId, min: u32, max: u32) -> Vec<NodeId> {
        (0..self.n)
            .filter(|&v| v != u)
            .filter(|&v| matches!(self.get(u, v), Some(d) if d > min && d <= max))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> AdjacencyMatrix {
        let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1)).collect();
        AdjacencyMatrix::from_edges(n, &edges).unwrap()
    }

    #[test]
    fn rejects_asymmetric_rows() {
        let rows = vec![vec![0.0, 1.0], vec![0.0, 0.0]];
        assert!(AdjacencyMatrix::from_rows(&rows).is_err());
    }

    #[test]
    fn rejects_self_loops() {
        assert!(AdjacencyMatrix::from_edges(3, &[(1, 1)]).is_err());
        let rows = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
        assert!(AdjacencyMatrix::from_rows(&rows).is_err());
    }

    #[test]
    fn path_distances() {
        let dm = path(4).hop_distances();
        assert_eq!(dm.get(0, 3), Some(3));
        assert_eq!(dm.get(2, 2), Some(0));
        assert_eq!(dm.nodes_in_band(0, 1, 2), vec![2]);
    }

    #[test]
    fn disconnected_graph_has_unreachable_pairs() {
        let g = AdjacencyMatrix::from_edges(4, &[(0, 1), (2, 3)]).unwrap();
        assert!(!g.is_connected());
        assert_eq!(g.hop_distances().get(0, 3), None);
    }

    #[test]
    fn triangle_neighbors_share_everything() {
        let g = AdjacencyMatrix::from_edges(3, &[(0, 1), (1, 2), (0, 2)]).unwrap();
        assert_eq!(g.common_neighbor_proportion(0, 1), 1.0);
        assert_eq!(path(3).common_neighbor_proportion(0, 1), 0.0);
    }

    #[test]
    fn deserializing_checks_shape_and_symmetry() {
        let ring: AdjacencyMatrix =
            serde_json::from_str(&serde_json::to_string(&path(3)).unwrap()).unwrap();
        assert_eq!(ring, path(3));

        assert!(serde_json::from_str::<AdjacencyMatrix>(r#"{"n":3,"weights":[0.0]}"#).is_err());
        let lopsided = r#"{"n":2,"weights":[0.0,1.0,0.0,0.0]}"#;
        assert!(serde_json::from_str::<AdjacencyMatrix>(lopsided).is_err());
    }

    #[test]
    fn intersection_keeps_shared_edges() {
        let a = AdjacencyMatrix::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let b = AdjacencyMatrix::from_edges(3, &[(1, 2), (0, 2)]).unwrap();
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.edges(), vec![Edge(1, 2)]);
        assert!(both.is_subgraph_of(&a));
    }
}
