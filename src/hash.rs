//! Keyed endpoint derivation.
//!
//! Every edge `e` of the implicit graph has one endpoint per side, computed as
//! `digest64(key, e, side) & node_mask`. The digest is a swappable capability
//! ([`EndpointHasher`]); nothing outside this module knows which construction
//! is in use.

use crate::config::GraphParams;
use crate::error::{HashError, Result, SolverError};
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher24;
use std::fmt;
use std::hash::Hasher as _;
use std::str::FromStr;
use std::sync::Arc;

/// Node identifier within one side, always `< 2^n`.
pub type NodeId = u64;

/// Context string for BLAKE3 key derivation of per-attempt keys.
const KEY_CONTEXT: &str = "cuckatoo-solver 2024 attempt key v1";

// ============================================================================
// Sides and edges
// ============================================================================

/// Bipartite side of a node. U-side and V-side ids are disjoint namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Source side (`side = 0`).
    U,
    /// Target side (`side = 1`).
    V,
}

impl Side {
    /// Byte folded into the hashed message.
    #[inline(always)]
    pub const fn as_byte(self) -> u8 {
        match self {
            Side::U => 0,
            Side::V => 1,
        }
    }

    /// The other side.
    #[inline(always)]
    pub const fn flip(self) -> Side {
        match self {
            Side::U => Side::V,
            Side::V => Side::U,
        }
    }
}

/// A node of the bipartite graph: side plus id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node {
    /// Side the id lives on.
    pub side: Side,
    /// Id within the side.
    pub id: NodeId,
}

impl Node {
    /// U-side node.
    pub const fn u(id: NodeId) -> Self {
        Self { side: Side::U, id }
    }

    /// V-side node.
    pub const fn v(id: NodeId) -> Self {
        Self { side: Side::V, id }
    }
}

/// An edge index together with its derived endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Edge index in `[0, 2^n)`.
    pub index: u64,
    /// U-side endpoint.
    pub u: NodeId,
    /// V-side endpoint.
    pub v: NodeId,
}

impl Edge {
    /// Endpoint on the given side.
    #[inline(always)]
    pub fn endpoint(&self, side: Side) -> Node {
        match side {
            Side::U => Node::u(self.u),
            Side::V => Node::v(self.v),
        }
    }

    /// Endpoint opposite to `from`. `from` must be one of this edge's endpoints.
    #[inline(always)]
    pub fn other(&self, from: Node) -> Node {
        debug_assert!(from == self.endpoint(from.side));
        self.endpoint(from.side.flip())
    }
}

// ============================================================================
// Key material
// ============================================================================

/// Everything an endpoint hash is keyed by: the header and the attempt index.
///
/// The 32-byte attempt key is derived once (BLAKE3 `derive_key` over
/// `header || attempt_le`) and reused for every edge of the attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    header: Arc<[u8]>,
    attempt: u64,
    key: [u8; 32],
}

impl KeyMaterial {
    /// Derives the key material for `(header, attempt)`.
    pub fn new(header: &[u8], attempt: u64) -> Self {
        Self::with_shared_header(Arc::from(header), attempt)
    }

    /// Same as [`KeyMaterial::new`] without copying an already shared header.
    pub fn with_shared_header(header: Arc<[u8]>, attempt: u64) -> Self {
        let mut material = Vec::with_capacity(header.len() + 8);
        material.extend_from_slice(&header);
        material.extend_from_slice(&attempt.to_le_bytes());
        let key = blake3::derive_key(KEY_CONTEXT, &material);
        Self {
            header,
            attempt,
            key,
        }
    }

    /// Header bytes.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Attempt index.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Derived 32-byte attempt key.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// The attempt key split into two little-endian `u64` words (SipHash keys).
    pub fn sip_keys(&self) -> (u64, u64) {
        let mut k0 = [0u8; 8];
        let mut k1 = [0u8; 8];
        k0.copy_from_slice(&self.key[0..8]);
        k1.copy_from_slice(&self.key[8..16]);
        (u64::from_le_bytes(k0), u64::from_le_bytes(k1))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("header", &hex::encode(&self.header))
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Hash capability
// ============================================================================

/// Keyed 64-bit hash used to place edge endpoints.
///
/// Implementations must be pure: the same `(key, edge, side)` always yields the
/// same digest. They are shared across rayon workers, hence `Send + Sync`.
pub trait EndpointHasher: Send + Sync {
    /// Short name used in logs and build info.
    fn name(&self) -> &'static str;

    /// Raw 64-bit digest of `(edge, side)` under `key`.
    ///
    /// # Errors
    /// Returns a [`HashError`] if the underlying construction cannot produce a digest.
    fn digest64(&self, key: &KeyMaterial, edge: u64, side: Side) -> std::result::Result<u64, HashError>;
}

/// BLAKE3 in keyed mode over `edge_le || side`. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl EndpointHasher for Blake3Hasher {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest64(&self, key: &KeyMaterial, edge: u64, side: Side) -> std::result::Result<u64, HashError> {
        let mut msg = [0u8; 9];
        msg[..8].copy_from_slice(&edge.to_le_bytes());
        msg[8] = side.as_byte();
        let hash = blake3::keyed_hash(key.key(), &msg);
        let mut word = [0u8; 8];
        word.copy_from_slice(&hash.as_bytes()[..8]);
        Ok(u64::from_le_bytes(word))
    }
}

/// SipHash-2-4 keyed by the first 16 bytes of the attempt key, hashing
/// `2 * edge + side` as in Cuckatoo.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipHasher;

impl EndpointHasher for SipHasher {
    fn name(&self) -> &'static str {
        "siphash24"
    }

    fn digest64(&self, key: &KeyMaterial, edge: u64, side: Side) -> std::result::Result<u64, HashError> {
        let nonce = edge
            .checked_mul(2)
            .map(|x| x | u64::from(side.as_byte()))
            .ok_or_else(|| HashError::new("siphash24", format!("edge index {edge} overflows nonce")))?;
        let (k0, k1) = key.sip_keys();
        let mut hasher = SipHasher24::new_with_keys(k0, k1);
        hasher.write(&nonce.to_le_bytes());
        Ok(hasher.finish())
    }
}

/// Built-in hasher selection for configuration files and the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// [`Blake3Hasher`].
    #[default]
    Blake3,
    /// [`SipHasher`].
    Siphash24,
}

impl HasherKind {
    /// Instantiates the selected hasher.
    pub fn build(self) -> Arc<dyn EndpointHasher> {
        match self {
            HasherKind::Blake3 => Arc::new(Blake3Hasher),
            HasherKind::Siphash24 => Arc::new(SipHasher),
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HasherKind::Blake3 => write!(f, "blake3"),
            HasherKind::Siphash24 => write!(f, "siphash24"),
        }
    }
}

impl FromStr for HasherKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(HasherKind::Blake3),
            "siphash24" | "siphash" | "sip" => Ok(HasherKind::Siphash24),
            other => Err(format!("unknown hasher `{other}` (expected blake3 or siphash24)")),
        }
    }
}

// ============================================================================
// Endpoint derivation
// ============================================================================

/// Derives the endpoint of `edge` on `side`, masked to `params.edge_bits()` bits.
///
/// # Errors
/// [`SolverError::InvalidParameter`] if `edge` is outside `[0, 2^n)`,
/// [`SolverError::HashFailure`] if the hasher fails.
#[inline]
pub fn endpoint(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    edge: u64,
    side: Side,
) -> Result<NodeId> {
    if edge >= params.edge_count() {
        return Err(SolverError::invalid(format!(
            "edge index {edge} outside [0, {})",
            params.edge_count()
        )));
    }
    hasher
        .digest64(key, edge, side)
        .map(|digest| digest & params.node_mask())
        .map_err(|source| SolverError::HashFailure {
            attempt: key.attempt(),
            edge,
            source,
        })
}

/// Derives both endpoints of `edge`.
///
/// # Errors
/// Same as [`endpoint`].
#[inline]
pub fn edge_endpoints(
    hasher: &dyn EndpointHasher,
    key: &KeyMaterial,
    params: GraphParams,
    edge: u64,
) -> Result<Edge> {
    Ok(Edge {
        index: edge,
        u: endpoint(hasher, key, params, edge, Side::U)?,
        v: endpoint(hasher, key, params, edge, Side::V)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
