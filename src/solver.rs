//! Attempt controller: partition, trim, merge, search, verify, retry.
//!
//! Each attempt derives a fresh key from `(header, attempt)` and runs the full
//! pipeline. Failing to find (or verify) a cycle moves on to the next attempt
//! index; running out of attempts or time ends the session with
//! [`Outcome::Exhausted`]. Only invalid parameters and hash failures are
//! errors.

use crate::config::{GraphParams, SolverConfig};
use crate::error::{Result, SolverError};
use crate::graph::GraphBuilder;
use crate::hash::{Edge, EndpointHasher, KeyMaterial};
use crate::partition::partition;
use crate::search::{CandidateCycle, CycleSearcher, ExhaustReason, SearchLimits, SearchOutcome};
use crate::trim::{BinTrim, LocalTrimmer};
use crate::validate::check_candidate;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Serialize, Serializer};
use std::mem::size_of;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

// ============================================================================
// Reports
// ============================================================================

/// Controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing running.
    Idle,
    /// Splitting the edge range.
    Partitioning,
    /// Trimming a bin (`bin` is the first bin of a parallel batch).
    Trimming {
        /// Bin being trimmed.
        bin: usize,
    },
    /// Merging survivors into the adjacency structure.
    Merging,
    /// Looking for a cycle.
    Searching,
    /// Checking a candidate.
    Verifying,
    /// A verified cycle was produced.
    Found,
    /// The attempt failed; the next attempt index follows.
    Retry,
    /// The budget ran out.
    Exhausted,
}

/// Running totals for a solve session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Attempts started.
    pub attempts: u64,
    /// Endpoint digests computed by trimming and candidate verification.
    pub hashes_computed: u64,
    /// Edge visits during trimming scans.
    pub edges_touched: u64,
    /// Trimming scans across all bins and attempts.
    pub trim_rounds: u64,
    /// Edges in the merged graph of the last attempt.
    pub edges_surviving: u64,
    /// DFS steps across all searches.
    pub search_states: u64,
    /// Searches cut short by the state cap.
    pub search_limit_hits: u64,
    /// Candidates the verifier rejected.
    pub rejected_candidates: u64,
    /// Estimated high-water mark of solver-owned working sets.
    pub peak_memory_bytes: u64,
    /// Wall-clock time of the session.
    #[serde(rename = "elapsed_ms", serialize_with = "duration_ms")]
    pub elapsed: Duration,
}

impl Counters {
    /// Copy with the wall-clock field zeroed, for comparing runs.
    pub fn without_timing(&self) -> Self {
        Self {
            elapsed: Duration::ZERO,
            ..self.clone()
        }
    }

    fn absorb_trim(&mut self, trim: &BinTrim) {
        self.hashes_computed += trim.stats.hashes_computed;
        self.edges_touched += trim.stats.edges_touched;
        self.trim_rounds += trim.stats.rounds as u64;
    }
}

/// A verified cycle and where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Solution {
    /// Edge indices in walk order.
    pub cycle: Vec<u64>,
    /// The same edges with their endpoints.
    pub edges: Vec<Edge>,
    /// Header the graph was keyed with.
    #[serde(serialize_with = "hex_bytes")]
    pub header: Vec<u8>,
    /// Attempt index that produced the graph.
    pub attempt: u64,
    /// Graph size exponent `n`.
    pub edge_bits: u32,
    /// Bin count `k`.
    pub bins: usize,
}

/// What stopped an unsuccessful session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exhaustion {
    /// `max_attempts` attempts ran.
    AttemptLimit,
    /// The time budget passed.
    TimeBudget,
}

/// Result of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// A verified cycle.
    Found(Solution),
    /// No cycle within budget.
    Exhausted {
        /// Which budget ran out.
        cause: Exhaustion,
    },
}

/// Outcome plus counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SolveReport {
    /// Found or exhausted.
    pub outcome: Outcome,
    /// Work done.
    pub counters: Counters,
}

impl SolveReport {
    /// The verified solution, if any.
    pub fn solution(&self) -> Option<&Solution> {
        match &self.outcome {
            Outcome::Found(solution) => Some(solution),
            Outcome::Exhausted { .. } => None,
        }
    }

    /// Whether a cycle was found.
    pub fn is_found(&self) -> bool {
        self.solution().is_some()
    }
}

fn duration_ms<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

fn hex_bytes<T: AsRef<[u8]>, S: Serializer>(bytes: &T, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}

// ============================================================================
// Solver
// ============================================================================

/// Owns the configuration, hasher and (optional) trimming pool of a session.
pub struct Solver {
    config: SolverConfig,
    params: GraphParams,
    hasher: Arc<dyn EndpointHasher>,
    pool: Option<ThreadPool>,
    phase: Phase,
}

impl Solver {
    /// Solver using the hasher named in `config`.
    ///
    /// # Errors
    /// [`SolverError::InvalidParameter`] if the config does not validate.
    pub fn new(config: SolverConfig) -> Result<Self> {
        let hasher = config.hasher.build();
        Self::with_hasher(config, hasher)
    }

    /// Solver using a caller-supplied hasher (the config's `hasher` is ignored).
    ///
    /// # Errors
    /// [`SolverError::InvalidParameter`] if the config does not validate or the
    /// trimming pool cannot be started.
    pub fn with_hasher(config: SolverConfig, hasher: Arc<dyn EndpointHasher>) -> Result<Self> {
        let params = config.validate()?;
        let pool = if config.threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|i| format!("cuckatoo-trim-{i}"))
                .build()
                .map_err(|e| SolverError::invalid(format!("cannot start {} threads: {e}", config.threads)))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            config,
            params,
            hasher,
            pool,
            phase: Phase::Idle,
        })
    }

    /// Current controller state.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Validated graph size.
    pub fn params(&self) -> GraphParams {
        self.params
    }

    /// Session configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Name of the hasher in use.
    pub fn hasher_name(&self) -> &'static str {
        self.hasher.name()
    }

    /// Runs attempts `start_attempt..start_attempt + max_attempts` until a
    /// verified cycle turns up or the budget is spent.
    ///
    /// # Errors
    /// Hash failures abort the session immediately.
    pub fn solve(&mut self, header: &[u8]) -> Result<SolveReport> {
        let started = Instant::now();
        let deadline = self.config.time_budget.map(|budget| started + budget);
        let header: Arc<[u8]> = Arc::from(header);
        let mut counters = Counters::default();

        info!(
            n = self.params.edge_bits(),
            k = self.config.bins,
            threads = self.config.threads,
            hasher = self.hasher.name(),
            max_attempts = self.config.max_attempts,
            "solve started"
        );

        self.transition(Phase::Idle);
        let mut cause = Exhaustion::AttemptLimit;
        for offset in 0..self.config.max_attempts {
            let attempt = self.config.start_attempt + offset;
            counters.attempts += 1;
            let key = KeyMaterial::with_shared_header(Arc::clone(&header), attempt);

            let found = match self.run_attempt(&key, &mut counters, deadline) {
                Ok(found) => found,
                Err(err) => {
                    self.transition(Phase::Idle);
                    return Err(err);
                }
            };
            if let Some(cycle) = found {
                self.transition(Phase::Found);
                counters.elapsed = started.elapsed();
                info!(attempt, attempts = counters.attempts, "cycle found");
                let solution = Solution {
                    cycle: cycle.indices(),
                    edges: cycle.edges,
                    header: header.to_vec(),
                    attempt,
                    edge_bits: self.params.edge_bits(),
                    bins: self.config.bins,
                };
                return Ok(SolveReport {
                    outcome: Outcome::Found(solution),
                    counters,
                });
            }
            self.transition(Phase::Retry);
            if deadline.is_some_and(|d| Instant::now() >= d) {
                cause = Exhaustion::TimeBudget;
                break;
            }
        }

        self.transition(Phase::Exhausted);
        counters.elapsed = started.elapsed();
        info!(attempts = counters.attempts, ?cause, "no cycle within budget");
        Ok(SolveReport {
            outcome: Outcome::Exhausted { cause },
            counters,
        })
    }

    /// One attempt. Returns the verified cycle, or `None` to retry.
    fn run_attempt(
        &mut self,
        key: &KeyMaterial,
        counters: &mut Counters,
        deadline: Option<Instant>,
    ) -> Result<Option<CandidateCycle>> {
        let hasher = Arc::clone(&self.hasher);
        let trimmer = LocalTrimmer::new(hasher.as_ref(), key, self.params, self.config.max_trim_rounds);

        self.transition(Phase::Partitioning);
        let bins = partition(self.params.edge_count(), self.config.bins, self.config.layout)?;

        let mut trims = Vec::with_capacity(bins.len());
        let mut trim_peak = 0u64;
        if self.pool.is_some() {
            self.transition(Phase::Trimming { bin: 0 });
            trace!(bins = bins.len(), "trimming bins in parallel");
            trims = trimmer.trim_all(&bins, self.pool.as_ref())?;
            trim_peak = trims.iter().map(|t| t.stats.working_set_bytes).sum();
        } else {
            for bin in &bins {
                self.transition(Phase::Trimming { bin: bin.id });
                let trim = trimmer.trim(bin)?;
                trim_peak = trim_peak.max(trim.stats.working_set_bytes);
                trims.push(trim);
            }
        }

        self.transition(Phase::Merging);
        let mut builder = GraphBuilder::new();
        for trim in trims {
            counters.absorb_trim(&trim);
            builder.add_bin(trim);
        }
        let survivor_bytes = (builder.pending() * size_of::<Edge>()) as u64;
        let adjacency = builder.finish();
        counters.edges_surviving = adjacency.edge_count() as u64;
        counters.peak_memory_bytes = counters
            .peak_memory_bytes
            .max(trim_peak + survivor_bytes)
            .max(adjacency.approx_bytes());

        debug!(
            attempt = key.attempt(),
            surviving = adjacency.edge_count(),
            nodes = adjacency.node_count(),
            "graph merged"
        );

        self.transition(Phase::Searching);
        let limits = SearchLimits {
            max_states: self.config.max_search_states,
            deadline,
        };
        let (outcome, stats) = CycleSearcher::new(&adjacency, limits).search();
        counters.search_states += stats.states;

        match outcome {
            SearchOutcome::Found(candidate) => {
                self.transition(Phase::Verifying);
                counters.hashes_computed += 2 * candidate.len() as u64;
                match check_candidate(hasher.as_ref(), key, self.params, &candidate) {
                    Ok(()) => Ok(Some(candidate)),
                    Err(defect) => {
                        counters.rejected_candidates += 1;
                        warn!(attempt = key.attempt(), %defect, "candidate rejected by verifier");
                        Ok(None)
                    }
                }
            }
            SearchOutcome::NotFound => {
                debug!(attempt = key.attempt(), states = stats.states, "no cycle in graph");
                Ok(None)
            }
            SearchOutcome::Exhausted(reason) => {
                if reason == ExhaustReason::StateLimit {
                    counters.search_limit_hits += 1;
                }
                debug!(attempt = key.attempt(), ?reason, "search cut short");
                Ok(None)
            }
        }
    }

    fn transition(&mut self, next: Phase) {
        trace!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

/// Convenience wrapper: build a [`Solver`] from `config` and solve `header`.
///
/// # Errors
/// Same as [`Solver::new`] and [`Solver::solve`].
pub fn solve(config: SolverConfig, header: &[u8]) -> Result<SolveReport> {
    Solver::new(config)?.solve(header)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CYCLE_LENGTH;
    use crate::error::HashError;
    use crate::hash::{Blake3Hasher, Side};
    use crate::testing::TableHasher;
    use crate::validate::verify;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn planted_solver(bins: usize, threads: usize) -> Solver {
        let mut table = TableHasher::cycle_table(CYCLE_LENGTH, 0).unwrap();
        // Pendant edges that trimming must discard.
        table.extend([(40, 50), (41, 50), (42, 51), (43, 52)]);
        table.resize(64, (60, 60));
        let config = SolverConfig {
            threads,
            ..SolverConfig::new(6, bins)
        };
        Solver::with_hasher(config, Arc::new(TableHasher::new(&table))).unwrap()
    }

    #[test]
    fn finds_planted_cycle_with_one_bin() {
        let mut solver = planted_solver(1, 1);
        let report = solver.solve(b"planted").unwrap();
        let solution = report.solution().expect("planted cycle");
        assert_eq!(solution.cycle.len(), CYCLE_LENGTH);
        assert_eq!(solution.attempt, 0);
        assert_eq!(solver.phase(), Phase::Found);
        assert_eq!(report.counters.attempts, 1);
        // 64 edges trimmed plus the 42 edges re-derived by the verifier.
        assert_eq!(report.counters.hashes_computed, 128 + 84);
        // 42 cycle edges plus the 18 copies of (60, 60) form the 2-core.
        assert_eq!(report.counters.edges_surviving, 42 + 18);

        let key = KeyMaterial::new(b"planted", 0);
        let hasher = TableHasher::new(&TableHasher::cycle_table(CYCLE_LENGTH, 0).unwrap());
        let params = GraphParams::new(6).unwrap();
        assert!(verify(&hasher, &key, params, &solution.cycle));
    }

    #[test]
    fn bins_splitting_the_cycle_lose_it() {
        // Each half of the cycle is a path inside its bin and is trimmed away.
        let mut solver = planted_solver(2, 1);
        let report = solver.solve(b"planted").unwrap();
        assert!(!report.is_found());
        assert_eq!(solver.phase(), Phase::Exhausted);
        assert_eq!(
            report.outcome,
            Outcome::Exhausted {
                cause: Exhaustion::AttemptLimit
            }
        );
    }

    #[test]
    fn parallel_trimming_matches_sequential() {
        let header = [5u8; 32];
        let config = SolverConfig {
            max_attempts: 3,
            ..SolverConfig::new(10, 4)
        };
        let sequential = solve(config.clone(), &header).unwrap();
        let parallel = solve(
            SolverConfig {
                threads: 4,
                ..config
            },
            &header,
        )
        .unwrap();
        assert_eq!(sequential.outcome, parallel.outcome);
        let (a, b) = (sequential.counters.without_timing(), parallel.counters.without_timing());
        assert_eq!(a.hashes_computed, b.hashes_computed);
        assert_eq!(a.edges_surviving, b.edges_surviving);
        assert_eq!(a.search_states, b.search_states);
    }

    #[test]
    fn exhausts_attempts_without_error() {
        let config = SolverConfig {
            max_attempts: 1,
            ..SolverConfig::new(4, 2)
        };
        let report = solve(config, &[0u8; 32]).unwrap();
        // 16 edges cannot hold a 42-cycle.
        assert!(!report.is_found());
        assert_eq!(report.counters.attempts, 1);
        assert_eq!(report.counters.hashes_computed, 32);
    }

    #[test]
    fn time_budget_stops_between_attempts() {
        let config = SolverConfig {
            max_attempts: 1_000_000,
            time_budget: Some(Duration::from_nanos(1)),
            ..SolverConfig::new(6, 1)
        };
        let report = solve(config, &[1u8; 32]).unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Exhausted {
                cause: Exhaustion::TimeBudget
            }
        );
        assert_eq!(report.counters.attempts, 1);
    }

    #[test]
    fn deadline_inside_last_attempt_reports_time_budget() {
        // K(8,8): every node has degree 8, nothing trims, and the search
        // wanders through short paths until the deadline check fires.
        let table: Vec<(u64, u64)> = (0..64).map(|e| (e / 8, e % 8)).collect();
        let config = SolverConfig {
            max_attempts: 1,
            time_budget: Some(Duration::from_nanos(1)),
            ..SolverConfig::new(6, 1)
        };
        let mut solver = Solver::with_hasher(config, Arc::new(TableHasher::new(&table))).unwrap();
        let report = solver.solve(b"dense").unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Exhausted {
                cause: Exhaustion::TimeBudget
            }
        );
        assert_eq!(report.counters.attempts, 1);
        assert_eq!(report.counters.search_states, 1024);
        assert_eq!(report.counters.search_limit_hits, 0);
        assert_eq!(solver.phase(), Phase::Exhausted);
    }

    #[test]
    fn invalid_config_fails_fast() {
        let err = Solver::new(SolverConfig::new(0, 4)).err().unwrap();
        assert!(err.is_invalid_parameter());
        let err = solve(SolverConfig::new(4, 17), b"").unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn hash_failure_aborts_the_session() {
        struct FailsOnEdge(u64);
        impl EndpointHasher for FailsOnEdge {
            fn name(&self) -> &'static str {
                "fails"
            }
            fn digest64(&self, key: &KeyMaterial, edge: u64, side: Side) -> std::result::Result<u64, HashError> {
                if edge == self.0 {
                    return Err(HashError::new("fails", "unlucky edge"));
                }
                Blake3Hasher.digest64(key, edge, side)
            }
        }
        let config = SolverConfig {
            max_attempts: 10,
            ..SolverConfig::new(8, 4)
        };
        let mut solver = Solver::with_hasher(config, Arc::new(FailsOnEdge(77))).unwrap();
        let err = solver.solve(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, SolverError::HashFailure { attempt: 0, edge: 77, .. }));
        assert_eq!(solver.phase(), Phase::Idle);
    }

    #[test]
    fn start_attempt_offsets_attempt_indices() {
        struct Recorder(AtomicU64);
        impl EndpointHasher for Recorder {
            fn name(&self) -> &'static str {
                "recorder"
            }
            fn digest64(&self, key: &KeyMaterial, edge: u64, side: Side) -> std::result::Result<u64, HashError> {
                self.0.fetch_max(key.attempt(), Ordering::Relaxed);
                Blake3Hasher.digest64(key, edge, side)
            }
        }
        let recorder = Arc::new(Recorder(AtomicU64::new(0)));
        let config = SolverConfig {
            start_attempt: 40,
            max_attempts: 3,
            ..SolverConfig::new(5, 1)
        };
        let report = Solver::with_hasher(config, recorder.clone())
            .unwrap()
            .solve(b"seeded")
            .unwrap();
        assert_eq!(report.counters.attempts, 3);
        assert_eq!(recorder.0.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut solver = planted_solver(1, 1);
        let report = solver.solve(&[0xab, 0xcd]).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "FOUND");
        assert_eq!(json["outcome"]["header"], "abcd");
        assert_eq!(json["outcome"]["cycle"].as_array().unwrap().len(), CYCLE_LENGTH);
        assert!(json["counters"]["elapsed_ms"].is_number());
    }
}
