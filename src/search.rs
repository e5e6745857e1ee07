//! Bounded depth-first search for a simple cycle of exact length.
//!
//! The DFS keeps its state on an explicit stack of frames so the state budget
//! and the deadline can be checked on every step. Neighbours are explored in
//! ascending edge-index order and start nodes in ascending id order, so the
//! same adjacency always yields the same cycle.

use crate::config::CYCLE_LENGTH;
use crate::error::{Result, SolverError};
use crate::graph::Adjacency;
use crate::hash::{Edge, Node, Side};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

/// Steps between deadline checks.
const DEADLINE_CHECK_EVERY: u64 = 1024;

// ============================================================================
// Configuration / results
// ============================================================================

/// Caps on one search.
#[derive(Clone, Copy, Debug)]
pub struct SearchLimits {
    /// Maximum DFS steps (edge examinations) across all start nodes.
    pub max_states: u64,
    /// Optional wall-clock cutoff.
    pub deadline: Option<Instant>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            deadline: None,
        }
    }
}

/// Why a search stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustReason {
    /// `max_states` was reached.
    StateLimit,
    /// The deadline passed.
    Deadline,
}

/// A closed walk found by the searcher, in walk order.
///
/// `edges[0]` leaves the start node on the U side; consecutive edges share
/// alternately their V and U endpoints, and the last edge returns to the start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateCycle {
    /// Edges with the endpoints the searcher saw.
    pub edges: Vec<Edge>,
}

impl CandidateCycle {
    /// Edge indices in walk order.
    pub fn indices(&self) -> Vec<u64> {
        self.edges.iter().map(|e| e.index).collect()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the cycle has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Result of one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A cycle of the target length.
    Found(CandidateCycle),
    /// Every start node was explored without success.
    NotFound,
    /// A limit cut the search short.
    Exhausted(ExhaustReason),
}

/// Work done by one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// DFS steps taken.
    pub states: u64,
    /// Start nodes tried.
    pub starts: u64,
    /// Deepest path reached, in edges.
    pub max_depth: usize,
}

// ============================================================================
// CycleSearcher
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct Frame {
    node: Node,
    /// Slot of the edge used to reach `node` (`None` for the start).
    via: Option<usize>,
    /// Next position in `node`'s incidence list.
    cursor: usize,
}

/// Searches an [`Adjacency`] for a simple cycle with `target_length` edges.
#[derive(Clone, Copy, Debug)]
pub struct CycleSearcher<'g> {
    adj: &'g Adjacency,
    target_length: usize,
    limits: SearchLimits,
}

impl<'g> CycleSearcher<'g> {
    /// Searcher for [`CYCLE_LENGTH`]-cycles.
    pub fn new(adj: &'g Adjacency, limits: SearchLimits) -> Self {
        Self {
            adj,
            target_length: CYCLE_LENGTH,
            limits,
        }
    }

    /// Searcher for cycles of another length.
    ///
    /// # Errors
    /// [`SolverError::InvalidParameter`] unless `target_length` is even and >= 2
    /// (a bipartite graph has no odd cycles).
    pub fn with_target_length(adj: &'g Adjacency, target_length: usize, limits: SearchLimits) -> Result<Self> {
        if target_length < 2 || target_length % 2 != 0 {
            return Err(SolverError::invalid(format!(
                "cycle length {target_length} must be even and >= 2"
            )));
        }
        Ok(Self {
            adj,
            target_length,
            limits,
        })
    }

    /// Runs the search.
    ///
    /// Start nodes are the U-side nodes of degree >= 2, ascending. A DFS started
    /// at `s` never enters a U-node with a smaller id: any cycle through such a
    /// node was already covered when that node was the start.
    pub fn search(&self) -> (SearchOutcome, SearchStats) {
        let mut stats = SearchStats::default();
        let mut on_path = HashSet::with_capacity(self.target_length);
        let mut path = Vec::with_capacity(self.target_length);

        for start in self.adj.nodes_with_degree(Side::U, 2) {
            stats.starts += 1;
            let outcome = self.search_from(start, &mut stats, &mut on_path, &mut path);
            if !matches!(outcome, SearchOutcome::NotFound) {
                return (outcome, stats);
            }
        }
        (SearchOutcome::NotFound, stats)
    }

    fn search_from(
        &self,
        start: Node,
        stats: &mut SearchStats,
        on_path: &mut HashSet<Node>,
        path: &mut Vec<usize>,
    ) -> SearchOutcome {
        on_path.clear();
        on_path.insert(start);
        path.clear();
        let mut stack = vec![Frame {
            node: start,
            via: None,
            cursor: 0,
        }];

        while let Some(top) = stack.last_mut() {
            stats.states += 1;
            if stats.states > self.limits.max_states {
                return SearchOutcome::Exhausted(ExhaustReason::StateLimit);
            }
            if stats.states % DEADLINE_CHECK_EVERY == 0
                && self.limits.deadline.is_some_and(|d| Instant::now() >= d)
            {
                return SearchOutcome::Exhausted(ExhaustReason::Deadline);
            }

            let incident = self.adj.incident(top.node);
            if top.cursor >= incident.len() {
                let done = *top;
                stack.pop();
                if done.via.is_some() {
                    on_path.remove(&done.node);
                    path.pop();
                }
                continue;
            }

            let slot = incident[top.cursor];
            top.cursor += 1;
            if top.via == Some(slot) {
                continue;
            }

            let depth = path.len() + 1;
            let next = self.adj.edge(slot).other(top.node);
            if next == start {
                if depth == self.target_length {
                    path.push(slot);
                    return SearchOutcome::Found(CandidateCycle {
                        edges: path.iter().map(|&s| *self.adj.edge(s)).collect(),
                    });
                }
                continue;
            }
            if depth >= self.target_length
                || on_path.contains(&next)
                || self.adj.degree(next) < 2
                || (next.side == Side::U && next.id < start.id)
            {
                continue;
            }

            on_path.insert(next);
            path.push(slot);
            stats.max_depth = stats.max_depth.max(path.len());
            stack.push(Frame {
                node: next,
                via: Some(slot),
                cursor: 0,
            });
        }
        SearchOutcome::NotFound
    }
}

// ============================================================================
// Tests
// ============================================================================
