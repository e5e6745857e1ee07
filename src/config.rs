//! Solver configuration and validated graph parameters.

use crate::error::{Result, SolverError};
use crate::hash::HasherKind;
use crate::partition::BinLayout;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest supported edge-bits exponent `n`.
pub const MIN_EDGE_BITS: u32 = 1;

/// Largest supported edge-bits exponent `n`. Node ids and edge indices are
/// `u64`, but a full pass over `2^n` edges beyond this is out of reach anyway.
pub const MAX_EDGE_BITS: u32 = 32;

/// Length of the cycle the solver looks for and the verifier accepts.
pub const CYCLE_LENGTH: usize = 42;

// ============================================================================
// GraphParams
// ============================================================================

/// Validated graph size.
///
/// `EdgeCount = 2^n`; node ids on each side lie in `[0, 2^n)`. U-side and
/// V-side ids are separate namespaces. Every stage reads sizes from here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphParams {
    edge_bits: u32,
}

impl GraphParams {
    /// Validates `n`.
    ///
    /// # Errors
    /// [`SolverError::InvalidParameter`] unless `MIN_EDGE_BITS <= n <= MAX_EDGE_BITS`.
    pub fn new(edge_bits: u32) -> Result<Self> {
        if !(MIN_EDGE_BITS..=MAX_EDGE_BITS).contains(&edge_bits) {
            return Err(SolverError::invalid(format!(
                "n = {edge_bits} outside supported range {MIN_EDGE_BITS}..={MAX_EDGE_BITS}"
            )));
        }
        Ok(Self { edge_bits })
    }

    /// The exponent `n`.
    #[inline(always)]
    pub const fn edge_bits(self) -> u32 {
        self.edge_bits
    }

    /// Number of edges, `2^n`.
    #[inline(always)]
    pub const fn edge_count(self) -> u64 {
        1u64 << self.edge_bits
    }

    /// Mask applied to raw digests to obtain node ids.
    #[inline(always)]
    pub const fn node_mask(self) -> u64 {
        self.edge_count() - 1
    }
}

// ============================================================================
// SolverConfig
// ============================================================================

/// Parameters for one solve session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Graph size exponent `n` (`2^n` edges, `2^n` nodes per side).
    pub edge_bits: u32,
    /// Number of bins `k` the edge range is split into.
    pub bins: usize,
    /// Worker threads for bin trimming. `1` trims on the calling thread.
    pub threads: usize,
    /// How edge indices are assigned to bins.
    pub layout: BinLayout,
    /// Built-in endpoint hasher.
    pub hasher: HasherKind,
    /// First attempt index (the CLI `--seed`).
    pub start_attempt: u64,
    /// Maximum number of attempts before reporting exhaustion.
    pub max_attempts: u64,
    /// Optional wall-clock budget for the whole session.
    pub time_budget: Option<Duration>,
    /// Upper bound on trimming scans per bin.
    pub max_trim_rounds: usize,
    /// Upper bound on DFS states explored per attempt.
    pub max_search_states: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            edge_bits: 12,
            bins: 4,
            threads: 1,
            layout: BinLayout::Contiguous,
            hasher: HasherKind::Blake3,
            start_attempt: 0,
            max_attempts: 1,
            time_budget: None,
            max_trim_rounds: 64,
            max_search_states: 1_000_000,
        }
    }
}

impl SolverConfig {
    /// Config for `n` and `k`, everything else default.
    pub fn new(edge_bits: u32, bins: usize) -> Self {
        Self {
            edge_bits,
            bins,
            ..Self::default()
        }
    }

    /// Checks every parameter and returns the validated graph size.
    ///
    /// # Errors
    /// [`SolverError::InvalidParameter`] describing the first bad value.
    pub fn validate(&self) -> Result<GraphParams> {
        let params = GraphParams::new(self.edge_bits)?;
        if self.bins == 0 {
            return Err(SolverError::invalid("k must be >= 1"));
        }
        if self.bins as u64 > params.edge_count() {
            return Err(SolverError::invalid(format!(
                "k = {} exceeds edge count {}",
                self.bins,
                params.edge_count()
            )));
        }
        if self.threads == 0 {
            return Err(SolverError::invalid("threads must be >= 1"));
        }
        if self.max_attempts == 0 {
            return Err(SolverError::invalid("max_attempts must be >= 1"));
        }
        if self
            .start_attempt
            .checked_add(self.max_attempts - 1)
            .is_none()
        {
            return Err(SolverError::invalid("attempt index range overflows u64"));
        }
        if self.time_budget.is_some_and(|b| b.is_zero()) {
            return Err(SolverError::invalid("time budget must be positive"));
        }
        if self.max_trim_rounds == 0 {
            return Err(SolverError::invalid("max_trim_rounds must be >= 1"));
        }
        if self.max_search_states == 0 {
            return Err(SolverError::invalid("max_search_states must be >= 1"));
        }
        Ok(params)
    }
}

// ============================================================================
// Tests
// ============================================================================
