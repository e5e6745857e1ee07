//! # Cuckatoo 42-Cycle Solver
//!
//! Finds a cycle of exactly 42 edges in a pseudo-random bipartite graph that is
//! defined implicitly by a keyed hash, without ever materialising the whole
//! graph.
//!
//! This crate provides:
//! - Keyed endpoint derivation behind a swappable [`hash::EndpointHasher`]
//!   capability (BLAKE3 by default, SipHash-2-4 as an alternative).
//! - A partitioner that splits the `2^n` edge indices into `k` bins.
//! - Per-bin leaf trimming with bounded, bin-local degree maps (sequential or on
//!   a rayon pool).
//! - A merged adjacency structure and a bounded, deterministic DFS for 42-cycles.
//! - An independent verifier that re-derives every endpoint.
//! - An attempt controller that retries with fresh attempt indices until a
//!   cycle is found or the budget runs out.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cuckatoo::prelude::*;
//!
//! let config = SolverConfig {
//!     max_attempts: 50,
//!     ..SolverConfig::new(10, 4)
//! };
//! let report = solve(config, &[0u8; 32]).expect("valid parameters");
//! match report.solution() {
//!     Some(sol) => println!("attempt {}: {:?}", sol.attempt, sol.cycle),
//!     None => println!("no cycle after {} attempts", report.counters.attempts),
//! }
//! ```
//!
//! ## Verifying a Cycle
//!
//! ```
//! use cuckatoo::prelude::*;
//!
//! // Too short to be a solution under any hash.
//! assert!(!verify_with(&Blake3Hasher, &[0u8; 32], 0, 10, &[1, 2, 3]));
//! ```
//!
//! ## Modules
//!
//! - [`hash`]: endpoint hashers and key material.
//! - [`config`]: solver configuration and validated graph size.
//! - [`partition`]: edge-range bins.
//! - [`trim`]: per-bin leaf trimming.
//! - [`graph`]: merged adjacency over surviving edges.
//! - [`search`]: bounded cycle search.
//! - [`validate`]: cycle verification.
//! - [`solver`]: the attempt controller.
//! - [`testing`]: a table-backed hasher for planting exact graphs.
//!
//! ## Graph Model
//!
//! - `EdgeCount = 2^n`; edge indices are `u64` in `[0, 2^n)`.
//! - Each side has `2^n` node ids; U-side and V-side ids never alias.
//! - Edge `e` joins `U(H(key, e, 0) mod 2^n)` and `V(H(key, e, 1) mod 2^n)`,
//!   where `key` is derived from the header and the attempt index.
//!
//! ## Performance Notes
//!
//! - Trimming is local to each bin. With `k > 1`, edges that are leaves inside
//!   their bin are dropped even when other bins would have kept them alive, so
//!   larger `k` saves memory at the cost of losing cycles that span bins.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod config;
pub mod error;
pub mod graph;
pub mod hash;
pub mod partition;
pub mod search;
pub mod solver;
pub mod testing;
pub mod trim;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{GraphParams, SolverConfig, CYCLE_LENGTH};
    pub use crate::error::{HashError, Result, SolverError};
    pub use crate::hash::{Blake3Hasher, EndpointHasher, HasherKind, KeyMaterial, Side, SipHasher};
    pub use crate::partition::BinLayout;
    pub use crate::solver::{solve, Counters, Outcome, SolveReport, Solution, Solver};
    pub use crate::validate::{verify, verify_with};
}
