//! Merged adjacency over the edges that survived trimming.

use crate::config::GraphParams;
use crate::error::Result;
use crate::hash::{edge_endpoints, Edge, EndpointHasher, KeyMaterial, Node, Side};
use crate::trim::BinTrim;
use std::collections::HashMap;
use std::mem::size_of;

// ============================================================================
// GraphBuilder
// ============================================================================

/// Single-owner accumulator for surviving edges.
///
/// Bins hand their survivors over one at a time; [`GraphBuilder::finish`]
/// sorts, removes duplicates and builds the incidence lists.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    edges: Vec<Edge>,
}

impl GraphBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one bin's survivors (endpoints already cached).
    pub fn add_bin(&mut self, trim: BinTrim) {
        self.edges.extend(trim.survivors);
    }

    /// Appends edges known only by index, deriving their endpoints.
    ///
    /// # Errors
    /// Propagates hasher failures.
    pub fn add_indices(
        &mut self,
        hasher: &dyn EndpointHasher,
        key: &KeyMaterial,
        params: GraphParams,
        indices: &[u64],
    ) -> Result<()> {
        self.edges.reserve(indices.len());
        for &e in indices {
            self.edges.push(edge_endpoints(hasher, key, params, e)?);
        }
        Ok(())
    }

    /// Number of edges added so far (duplicates included).
    pub fn pending(&self) -> usize {
        self.edges.len()
    }

    /// Builds the adjacency structure.
    pub fn finish(mut self) -> Adjacency {
        self.edges.sort_unstable_by_key(|e| e.index);
        self.edges.dedup_by_key(|e| e.index);

        let mut incidence: HashMap<Node, Vec<usize>> = HashMap::with_capacity(2 * self.edges.len());
        for (slot, edge) in self.edges.iter().enumerate() {
            incidence.entry(Node::u(edge.u)).or_default().push(slot);
            incidence.entry(Node::v(edge.v)).or_default().push(slot);
        }

        Adjacency {
            edges: self.edges,
            incidence,
        }
    }
}

// ============================================================================
// Adjacency
// ============================================================================

/// Node -> incident surviving edges. Incidence lists are ascending by edge index.
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
    edges: Vec<Edge>,
    incidence: HashMap<Node, Vec<usize>>,
}

impl Adjacency {
    /// Shorthand for building from already-endpointed edges.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        GraphBuilder {
            edges: edges.into_iter().collect(),
        }
        .finish()
    }

    /// Edge stored at `slot`.
    #[inline(always)]
    pub fn edge(&self, slot: usize) -> &Edge {
        &self.edges[slot]
    }

    /// All edges, ascending by index.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Slots of edges incident to `node` (empty if the node is absent).
    #[inline]
    pub fn incident(&self, node: Node) -> &[usize] {
        self.incidence.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of surviving edges incident to `node`.
    #[inline]
    pub fn degree(&self, node: Node) -> usize {
        self.incident(node).len()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of nodes with at least one incident edge.
    pub fn node_count(&self) -> usize {
        self.incidence.len()
    }

    /// Whether no edges survived.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Nodes on `side` with degree at least `min_degree`, ascending by id.
    pub fn nodes_with_degree(&self, side: Side, min_degree: usize) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .incidence
            .iter()
            .filter(|(node, slots)| node.side == side && slots.len() >= min_degree)
            .map(|(node, _)| *node)
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Estimated bytes held by the edge table and incidence lists.
    pub fn approx_bytes(&self) -> u64 {
        let lists: usize = self.incidence.values().map(Vec::capacity).sum();
        (self.edges.capacity() * size_of::<Edge>()
            + self.incidence.capacity() * (size_of::<Node>() + size_of::<Vec<usize>>())
            + lists * size_of::<usize>()) as u64
    }
}

// ============================================================================
// Tests
// ============================================================================
