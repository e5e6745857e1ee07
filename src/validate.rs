//! Independent verification of candidate cycles.
//!
//! The verifier re-derives every endpoint through the hasher and never looks
//! at adjacency or search state. It is the only authority for accepting a
//! cycle: the solver reports nothing as found unless [`check_cycle`] passes.

use crate::config::{GraphParams, CYCLE_LENGTH};
use crate::hash::{edge_endpoints, Edge, EndpointHasher, KeyMaterial, Node, Side};
use crate::search::CandidateCycle;
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Public API
// ============================================================================

/// Why a candidate was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CycleDefect {
    /// Not exactly [`CYCLE_LENGTH`] edges.
    #[error("cycle has {got} edges (expected {expected})", expected = CYCLE_LENGTH)]
    WrongLength {
        /// Number of edges supplied.
        got: usize,
    },
    /// An edge index appears twice.
    #[error("edge {edge} appears more than once")]
    DuplicateEdge {
        /// The repeated index.
        edge: u64,
    },
    /// An edge index is outside `[0, 2^n)`.
    #[error("edge {edge} outside [0, {edge_count})")]
    EdgeOutOfRange {
        /// The offending index.
        edge: u64,
        /// `2^n`.
        edge_count: u64,
    },
    /// Endpoints could not be recomputed.
    #[error("endpoint derivation failed: {0}")]
    Hash(String),
    /// A cached endpoint disagrees with the recomputed one.
    #[error("edge {edge} endpoints differ from recomputation")]
    EndpointMismatch {
        /// The edge whose cached endpoints are wrong.
        edge: u64,
    },
    /// Consecutive edges do not meet on the expected side.
    #[error("edges at positions {position} and {next} are not joined")]
    NotAdjacent {
        /// Position of the first edge.
        position: usize,
        /// Position of the following edge (wraps to 0).
        next: usize,
    },
    /// The walk visits a node twice.
    #[error("node {node:?} visited more than once")]
    RepeatedNode {
        /// The repeated node.
        node: Node,
    },
}

/// Returns `true` iff `cycle` lists the edges of a simple [`CYCLE_LENGTH`]-cycle
/// in walk order (any rotation or direction).
pub fn verify(hasher: &dyn EndpointHasher, key: &KeyMaterial, params: GraphParams, cycle: &[u64]) -> bool {
    check_cycle(hasher, key, params, cycle).is_ok()
}

/// Like [`verify`], and additionally rejects candidates whose cached endpoints
/// do not match a fresh derivation.
pub fn verify_candidate(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    candidate: &CandidateCycle,
) -> bool {
    check_candidate(hasher, key, params, candidate).is_ok()
}

/// Verifies from raw inputs. Unsupported `n` is a rejection, not an error.
pub fn verify_with(hasher: &dyn EndpointHasher, header: &[u8], attempt: u64, edge_bits: u32, cycle: &[u64]) -> bool {
    let Ok(params) = GraphParams::new(edge_bits) else {
        return false;
    };
    verify(hasher, &KeyMaterial::new(header, attempt), params, cycle)
}

/// Checks a cycle given by edge indices.
///
/// # Errors
/// The first [`CycleDefect`] found.
pub fn check_cycle(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    cycle: &[u64],
) -> Result<(), CycleDefect> {
    let edges = recompute(hasher, key, params, cycle)?;
    check_walk(&edges)
}

/// Checks a searcher candidate, cached endpoints included.
///
/// # Errors
/// The first [`CycleDefect`] found.
pub fn check_candidate(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    candidate: &CandidateCycle,
) -> Result<(), CycleDefect> {
    let edges = recompute(hasher, key, params, &candidate.indices())?;
    if let Some((_, claimed)) = edges
        .iter()
        .zip(&candidate.edges)
        .find(|(fresh, claimed)| fresh != claimed)
    {
        return Err(CycleDefect::EndpointMismatch { edge: claimed.index });
    }
    check_walk(&edges)
}

// ============================================================================
// Internal
// ============================================================================

fn recompute(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    cycle: &[u64],
) -> Result<Vec<Edge>, CycleDefect> {
    if cycle.len() != CYCLE_LENGTH {
        return Err(CycleDefect::WrongLength { got: cycle.len() });
    }
    let mut seen = HashSet::with_capacity(cycle.len());
    for &edge in cycle {
        if edge >= params.edge_count() {
            return Err(CycleDefect::EdgeOutOfRange {
                edge,
                edge_count: params.edge_count(),
            });
        }
        if !seen.insert(edge) {
            return Err(CycleDefect::DuplicateEdge { edge });
        }
    }
    cycle
        .iter()
        .map(|&e| edge_endpoints(hasher, key, params, e).map_err(|err| CycleDefect::Hash(err.to_string())))
        .collect()
}

/// Edges `i` and `i+1` must share their endpoint on one side, alternating
/// sides around the cycle; the shared nodes must all be distinct.
fn check_walk(edges: &[Edge]) -> Result<(), CycleDefect> {
    let len = edges.len();
    let first_shared = if edges[0].v == edges[1].v {
        Side::V
    } else if edges[0].u == edges[1].u {
        Side::U
    } else {
        return Err(CycleDefect::NotAdjacent { position: 0, next: 1 });
    };

    let mut nodes = HashSet::with_capacity(len);
    let mut side = first_shared;
    for i in 0..len {
        let next = (i + 1) % len;
        let node = edges[i].endpoint(side);
        if node != edges[next].endpoint(side) {
            return Err(CycleDefect::NotAdjacent { position: i, next });
        }
        if !nodes.insert(node) {
            return Err(CycleDefect::RepeatedNode { node });
        }
        side = side.flip();
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
