//! Hand-built graphs behind the [`EndpointHasher`] seam.
//!
//! [`TableHasher`] returns endpoints from an explicit table instead of a
//! digest, which lets tests plant exact structures (a known
//! 42-cycle, a pendant path, ...) and drive every solver stage through the
//! same capability the real hashers use.

use crate::error::HashError;
use crate::hash::{EndpointHasher, KeyMaterial, NodeId, Side};

/// Endpoint table hasher: edge `e` maps to `table[e]`, regardless of the key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableHasher {
    table: Vec<(NodeId, NodeId)>,
}

impl TableHasher {
    /// Builds a hasher from `(u, v)` pairs indexed by edge.
    pub fn new(table: &[(NodeId, NodeId)]) -> Self {
        Self {
            table: table.to_vec(),
        }
    }

    /// Number of edges with a table entry.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Edges of a simple cycle alternating `U0 V0 U1 V1 ...` with `length`
    /// edges, offset by `base` on both sides. `None` unless `length` is even
    /// and at least 2.
    ///
    /// Edge `2i` joins `U(base+i)` and `V(base+i)`; edge `2i+1` joins `V(base+i)`
    /// and `U(base + (i+1) % (length/2))`.
    pub fn cycle_table(length: usize, base: NodeId) -> Option<Vec<(NodeId, NodeId)>> {
        if length < 2 || length % 2 != 0 {
            return None;
        }
        let half = (length / 2) as NodeId;
        let table = (0..length)
            .map(|j| {
                let i = (j / 2) as NodeId;
                if j % 2 == 0 {
                    (base + i, base + i)
                } else {
                    (base + (i + 1) % half, base + i)
                }
            })
            .collect();
        Some(table)
    }
}

impl EndpointHasher for TableHasher {
    fn name(&self) -> &'static str {
        "table"
    }

    fn digest64(&self, _key: &KeyMaterial, edge: u64, side: Side) -> Result<u64, HashError> {
        let (u, v) = usize::try_from(edge)
            .ok()
            .and_then(|i| self.table.get(i))
            .copied()
            .ok_or_else(|| HashError::new("table", format!("no entry for edge {edge}")))?;
        Ok(match side {
            Side::U => u,
            Side::V => v,
        })
    }
}
