//! End-to-end solver scenarios.

use cuckatoo::config::CYCLE_LENGTH;
use cuckatoo::graph::Adjacency;
use cuckatoo::hash::{edge_endpoints, endpoint, Edge, Node};
use cuckatoo::partition::partition;
use cuckatoo::prelude::*;
use cuckatoo::solver::Exhaustion;
use cuckatoo::testing::TableHasher;
use cuckatoo::trim::LocalTrimmer;
use cuckatoo::validate::{check_cycle, CycleDefect};
use std::collections::BTreeSet;
use std::sync::Arc;

const ZERO_HEADER: [u8; 32] = [0u8; 32];

#[test]
fn zero_header_n10_k4_is_reproducible() {
    let config = SolverConfig {
        max_attempts: 50,
        ..SolverConfig::new(10, 4)
    };
    let first = solve(config.clone(), &ZERO_HEADER).unwrap();
    let second = solve(config, &ZERO_HEADER).unwrap();

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.counters.without_timing(), second.counters.without_timing());

    match &first.outcome {
        Outcome::Found(solution) => {
            assert_eq!(solution.cycle.len(), CYCLE_LENGTH);
            assert!(verify_with(
                &Blake3Hasher,
                &ZERO_HEADER,
                solution.attempt,
                10,
                &solution.cycle
            ));
            assert_eq!(first.counters.attempts, solution.attempt + 1);
        }
        Outcome::Exhausted { cause } => {
            assert_eq!(*cause, Exhaustion::AttemptLimit);
            assert_eq!(first.counters.attempts, 50);
        }
    }
}

#[test]
fn one_attempt_without_cycle_is_exhausted_not_an_error() {
    // 256 edges in 16 bins: nothing can survive local trimming long enough
    // to close a 42-cycle.
    let config = SolverConfig {
        max_attempts: 1,
        ..SolverConfig::new(8, 16)
    };
    let report = solve(config, &ZERO_HEADER).unwrap();
    assert_eq!(
        report.outcome,
        Outcome::Exhausted {
            cause: Exhaustion::AttemptLimit
        }
    );
    assert_eq!(report.counters.attempts, 1);
    assert_eq!(report.counters.hashes_computed, 512);
}

#[test]
fn endpoint_hash_is_stable_across_calls() {
    let params = GraphParams::new(10).unwrap();
    for kind in [HasherKind::Blake3, HasherKind::Siphash24] {
        let hasher = kind.build();
        for attempt in [0, 1, 49] {
            let key = KeyMaterial::new(&ZERO_HEADER, attempt);
            for edge in [0, 1, 511, 1023] {
                for side in [Side::U, Side::V] {
                    let a = endpoint(hasher.as_ref(), &key, params, edge, side).unwrap();
                    let b = endpoint(hasher.as_ref(), &KeyMaterial::new(&ZERO_HEADER, attempt), params, edge, side)
                        .unwrap();
                    assert_eq!(a, b);
                }
            }
        }
    }
}

#[test]
fn single_bin_equals_unpartitioned_trim() {
    let params = GraphParams::new(9).unwrap();
    let key = KeyMaterial::new(&ZERO_HEADER, 0);
    let trimmer = LocalTrimmer::new(&Blake3Hasher, &key, params, 10_000);

    let bins = partition(params.edge_count(), 1, BinLayout::Contiguous).unwrap();
    let binned: BTreeSet<u64> = trimmer.trim(&bins[0]).unwrap().survivors.iter().map(|e| e.index).collect();

    // Reference: recompute global degrees and drop leaves until nothing changes.
    let mut edges: Vec<Edge> = (0..params.edge_count())
        .map(|e| edge_endpoints(&Blake3Hasher, &key, params, e).unwrap())
        .collect();
    loop {
        let graph = Adjacency::from_edges(edges.iter().copied());
        let before = edges.len();
        edges.retain(|e| graph.degree(Node::u(e.u)) >= 2 && graph.degree(Node::v(e.v)) >= 2);
        if edges.len() == before {
            break;
        }
    }
    let reference: BTreeSet<u64> = edges.iter().map(|e| e.index).collect();
    assert_eq!(binned, reference);
}

#[test]
fn parallel_and_strided_runs_are_deterministic() {
    for layout in [BinLayout::Contiguous, BinLayout::Strided] {
        let base = SolverConfig {
            layout,
            max_attempts: 4,
            ..SolverConfig::new(11, 4)
        };
        let sequential = solve(base.clone(), &ZERO_HEADER).unwrap();
        let parallel = solve(SolverConfig { threads: 3, ..base }, &ZERO_HEADER).unwrap();
        assert_eq!(sequential.outcome, parallel.outcome);
        assert_eq!(
            sequential.counters.hashes_computed,
            parallel.counters.hashes_computed
        );
        assert_eq!(sequential.counters.search_states, parallel.counters.search_states);
    }
}

#[test]
fn planted_cycle_round_trips_through_solver_and_verifier() {
    // Cycle on U7..U27 / V7..V27, two pendants, the rest parallel (63, 63).
    let mut table = TableHasher::cycle_table(CYCLE_LENGTH, 7).unwrap();
    table.extend([(40, 41), (40, 42)]);
    table.resize(64, (63, 63));
    let hasher = Arc::new(TableHasher::new(&table));
    let config = SolverConfig::new(6, 1);
    let mut solver = Solver::with_hasher(config, hasher.clone()).unwrap();
    let report = solver.solve(b"table").unwrap();
    let solution = report.solution().expect("planted cycle must be found");
    assert_eq!(report.counters.edges_surviving, 42 + 20);
    assert_eq!(solution.cycle, (0..CYCLE_LENGTH as u64).collect::<Vec<_>>());

    let key = KeyMaterial::new(b"table", solution.attempt);
    let params = GraphParams::new(6).unwrap();
    assert!(verify(hasher.as_ref(), &key, params, &solution.cycle));

    let mut tampered = solution.cycle.clone();
    tampered.swap(0, 1);
    assert!(matches!(
        check_cycle(hasher.as_ref(), &key, params, &tampered),
        Err(CycleDefect::NotAdjacent { .. })
    ));
    assert!(!verify(hasher.as_ref(), &key, params, &solution.cycle[1..]));
}

#[test]
fn invalid_parameters_fail_fast() {
    for config in [
        SolverConfig::new(0, 1),
        SolverConfig::new(64, 1),
        SolverConfig::new(8, 0),
        SolverConfig::new(4, 32),
        SolverConfig {
            max_attempts: 0,
            ..SolverConfig::new(8, 2)
        },
    ] {
        let err = solve(config, &ZERO_HEADER).unwrap_err();
        assert!(err.is_invalid_parameter(), "{err}");
    }
}
