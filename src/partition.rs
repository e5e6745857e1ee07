//! Splitting the edge range into independently trimmed bins.

use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How edge indices are distributed across bins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinLayout {
    /// Bin `i` is one contiguous run of edge indices.
    #[default]
    Contiguous,
    /// Bin `i` holds every edge with `e % k == i`.
    Strided,
}

impl fmt::Display for BinLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinLayout::Contiguous => write!(f, "contiguous"),
            BinLayout::Strided => write!(f, "strided"),
        }
    }
}

impl FromStr for BinLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contiguous" => Ok(BinLayout::Contiguous),
            "strided" => Ok(BinLayout::Strided),
            other => Err(format!("unknown layout `{other}` (expected contiguous or strided)")),
        }
    }
}

/// An arithmetic progression of edge indices: `start + j * stride` for `j < len`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bin {
    /// Position of this bin in the partition.
    pub id: usize,
    /// First edge index.
    pub start: u64,
    /// Number of edges.
    pub len: u64,
    /// Distance between consecutive edge indices.
    pub stride: u64,
}

impl Bin {
    /// Edge indices in increasing order.
    pub fn edges(&self) -> impl Iterator<Item = u64> + '_ {
        let Bin { start, stride, .. } = *self;
        (0..self.len).map(move |j| start + j * stride)
    }

    /// Whether `edge` belongs to this bin.
    pub fn contains(&self, edge: u64) -> bool {
        if edge < self.start || self.len == 0 {
            return false;
        }
        let offset = edge - self.start;
        offset % self.stride == 0 && offset / self.stride < self.len
    }

    /// Number of edges as `usize` (bins are sized to fit in memory).
    #[inline]
    pub fn size(&self) -> usize {
        self.len as usize
    }

    /// Whether the bin holds no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Splits `[0, edge_count)` into `k` disjoint bins whose sizes differ by at most one.
///
/// Bins are returned in increasing `id` order and each iterates its edges in
/// increasing order.
///
/// # Errors
/// [`SolverError::InvalidParameter`] if `k == 0` or `k > edge_count`.
pub fn partition(edge_count: u64, k: usize, layout: BinLayout) -> Result<Vec<Bin>> {
    if k == 0 {
        return Err(SolverError::invalid("k must be >= 1"));
    }
    let bins = k as u64;
    if bins > edge_count {
        return Err(SolverError::invalid(format!(
            "k = {k} exceeds edge count {edge_count}"
        )));
    }

    let base = edge_count / bins;
    let extra = edge_count % bins;
    let out = (0..bins)
        .map(|i| {
            let len = base + u64::from(i < extra);
            let (start, stride) = match layout {
                BinLayout::Contiguous => (i * base + i.min(extra), 1),
                BinLayout::Strided => (i, bins),
            };
            Bin {
                id: i as usize,
                start,
                len,
                stride,
            }
        })
        .collect();
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check_cover(edge_count: u64, k: usize, layout: BinLayout) {
        let bins = partition(edge_count, k, layout).unwrap();
        assert_eq!(bins.len(), k);
        let mut seen = vec![0u8; edge_count as usize];
        for (i, bin) in bins.iter().enumerate() {
            assert_eq!(bin.id, i);
            let edges: Vec<u64> = bin.edges().collect();
            assert_eq!(edges.len(), bin.size());
            assert!(edges.windows(2).all(|w| w[0] < w[1]));
            for e in edges {
                assert!(bin.contains(e));
                seen[e as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1), "gap or overlap");
        let min = bins.iter().map(|b| b.len).min().unwrap();
        let max = bins.iter().map(|b| b.len).max().unwrap();
        assert!(max - min <= 1);
    }

    #[test]
    fn contiguous_example() {
        let bins = partition(10, 3, BinLayout::Contiguous).unwrap();
        let ranges: Vec<Vec<u64>> = bins.iter().map(|b| b.edges().collect()).collect();
        assert_eq!(ranges, vec![vec![0, 1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
    }

    #[test]
    fn strided_example() {
        let bins = partition(10, 3, BinLayout::Strided).unwrap();
        let ranges: Vec<Vec<u64>> = bins.iter().map(|b| b.edges().collect()).collect();
        assert_eq!(ranges, vec![vec![0, 3, 6, 9], vec![1, 4, 7], vec![2, 5, 8]]);
        assert!(!bins[1].contains(3));
        assert!(!bins[2].contains(11));
    }

    #[test]
    fn single_bin_is_whole_range() {
        let bins = partition(1024, 1, BinLayout::Contiguous).unwrap();
        assert_eq!(bins, vec![Bin { id: 0, start: 0, len: 1024, stride: 1 }]);
    }

    #[test]
    fn rejects_zero_and_oversized_k() {
        assert!(partition(16, 0, BinLayout::Contiguous).unwrap_err().is_invalid_parameter());
        assert!(partition(16, 17, BinLayout::Strided).unwrap_err().is_invalid_parameter());
        assert!(partition(16, 16, BinLayout::Contiguous).is_ok());
    }

    #[test]
    fn layout_parses() {
        assert_eq!("Strided".parse::<BinLayout>().unwrap(), BinLayout::Strided);
        assert!("random".parse::<BinLayout>().is_err());
    }

    proptest! {
        #[test]
        fn partitions_cover_exactly(edge_count in 1u64..2_000, k_seed in 0usize..10_000, strided in any::<bool>()) {
            let k = 1 + k_seed % edge_count as usize;
            let layout = if strided { BinLayout::Strided } else { BinLayout::Contiguous };
            check_cover(edge_count, k, layout);
        }
    }
}
