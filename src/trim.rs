//! Per-bin leaf trimming.
//!
//! Each bin derives the endpoints of its own edges, counts node degrees over
//! those edges only, and repeatedly drops edges touching a degree-1 node. A
//! bin never sees another bin's edges, so bins can be trimmed in any order or
//! in parallel with identical results.

use crate::config::GraphParams;
use crate::error::Result;
use crate::hash::{edge_endpoints, Edge, EndpointHasher, KeyMaterial, NodeId};
use crate::partition::Bin;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashMap;
use std::mem::size_of;
use tracing::trace;

// ============================================================================
// Results
// ============================================================================

/// Work done while trimming one bin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrimStats {
    /// Endpoint digests computed.
    pub hashes_computed: u64,
    /// Edge visits across all scans.
    pub edges_touched: u64,
    /// Scans performed.
    pub rounds: usize,
    /// Whether the last scan removed nothing.
    pub converged: bool,
    /// Edges dropped.
    pub removed: u64,
    /// Estimated bytes held by the bin's edge buffer and degree maps.
    pub working_set_bytes: u64,
}

/// Survivors of one bin, ascending by edge index, endpoints cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinTrim {
    /// Id of the trimmed bin.
    pub bin: usize,
    /// Edges whose endpoints both have local degree >= 2.
    pub survivors: Vec<Edge>,
    /// Counters for this bin.
    pub stats: TrimStats,
}

// ============================================================================
// DegreeMap
// ============================================================================

/// Node degrees over one bin's live edges, one map per side.
#[derive(Debug, Default)]
struct DegreeMap {
    u: HashMap<NodeId, u32>,
    v: HashMap<NodeId, u32>,
}

impl DegreeMap {
    fn from_edges(edges: &[Edge]) -> Self {
        let mut map = Self {
            u: HashMap::with_capacity(edges.len()),
            v: HashMap::with_capacity(edges.len()),
        };
        for edge in edges {
            *map.u.entry(edge.u).or_insert(0) += 1;
            *map.v.entry(edge.v).or_insert(0) += 1;
        }
        map
    }

    #[inline]
    fn is_leaf_edge(&self, edge: &Edge) -> bool {
        self.u.get(&edge.u).copied().unwrap_or(0) < 2 || self.v.get(&edge.v).copied().unwrap_or(0) < 2
    }

    #[inline]
    fn remove(&mut self, edge: &Edge) {
        if let Some(d) = self.u.get_mut(&edge.u) {
            *d -= 1;
        }
        if let Some(d) = self.v.get_mut(&edge.v) {
            *d -= 1;
        }
    }

    fn approx_bytes(&self) -> u64 {
        let slot = size_of::<NodeId>() + size_of::<u32>();
        ((self.u.capacity() + self.v.capacity()) * slot) as u64
    }
}

// ============================================================================
// LocalTrimmer
// ============================================================================

/// Trims bins of one attempt's graph.
#[derive(Clone, Copy)]
pub struct LocalTrimmer<'a> {
    hasher: &'a dyn EndpointHasher,
    key: &'a KeyMaterial,
    params: GraphParams,
    max_rounds: usize,
}

impl<'a> LocalTrimmer<'a> {
    /// Creates a trimmer running at most `max_rounds` scans per bin.
    pub fn new(
        hasher: &'a dyn EndpointHasher,
        key: &'a KeyMaterial,
        params: GraphParams,
        max_rounds: usize,
    ) -> Self {
        Self {
            hasher,
            key,
            params,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Trims a single bin to its local 2-core (or until `max_rounds` scans ran).
    ///
    /// # Errors
    /// Propagates hasher failures and out-of-range edge indices.
    pub fn trim(&self, bin: &Bin) -> Result<BinTrim> {
        let mut stats = TrimStats::default();

        let mut edges = Vec::with_capacity(bin.size());
        for e in bin.edges() {
            edges.push(edge_endpoints(self.hasher, self.key, self.params, e)?);
        }
        stats.hashes_computed = 2 * edges.len() as u64;

        let mut degrees = DegreeMap::from_edges(&edges);
        let mut alive = vec![true; edges.len()];
        stats.working_set_bytes = (edges.capacity() * size_of::<Edge>() + alive.len()) as u64
            + degrees.approx_bytes();

        for _ in 0..self.max_rounds {
            stats.rounds += 1;
            let mut removed = 0u64;
            for (slot, edge) in edges.iter().enumerate() {
                if !alive[slot] {
                    continue;
                }
                stats.edges_touched += 1;
                if degrees.is_leaf_edge(edge) {
                    alive[slot] = false;
                    degrees.remove(edge);
                    removed += 1;
                }
            }
            stats.removed += removed;
            if removed == 0 {
                stats.converged = true;
                break;
            }
        }

        let survivors: Vec<Edge> = edges
            .into_iter()
            .zip(alive)
            .filter_map(|(edge, keep)| keep.then_some(edge))
            .collect();

        trace!(
            bin = bin.id,
            size = bin.len,
            survivors = survivors.len(),
            rounds = stats.rounds,
            converged = stats.converged,
            "bin trimmed"
        );

        Ok(BinTrim {
            bin: bin.id,
            survivors,
            stats,
        })
    }

    /// Trims every bin, in parallel on `pool` if given. Results come back in
    /// bin order regardless of scheduling.
    ///
    /// # Errors
    /// The first failure encountered by any bin.
    pub fn trim_all(&self, bins: &[Bin], pool: Option<&ThreadPool>) -> Result<Vec<BinTrim>> {
        match pool {
            Some(pool) => pool.install(|| bins.par_iter().map(|bin| self.trim(bin)).collect()),
            None => bins.iter().map(|bin| self.trim(bin)).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
