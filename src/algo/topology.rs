//! Discrete simple-point test on the vertex graph.
//!
//! A vertex is *simple* with respect to a thresholded field if flipping its
//! membership (inside ↔ outside) leaves the topology of the inside set
//! unchanged locally. The curve connector only lets a vertex cross the
//! threshold when it is simple, which keeps the curve from splitting or
//! closing loops.
//!
//! The test looks at the one-ring of the vertex:
//!
//! - If every neighbor is on the same side, the vertex is *not* simple.
//! - If exactly one neighbor is inside, or exactly one is outside, it is.
//! - Otherwise each inside neighbor contributes itself plus its own inside
//!   neighbors (the tested vertex excluded). Inside neighbors whose sets
//!   overlap are merged; the vertex is simple iff a single group remains.

use crate::mesh::NeighborList;

/// Test whether `vertex` is simple in the field `values` at `threshold`.
///
/// A vertex `k` is inside when `values[k] > threshold`. Ids beyond the end
/// of `values` count as outside.
///
/// # Example
///
/// ```
/// use fundi::algo::topology::is_simple;
/// use fundi::mesh::NeighborList;
///
/// // Vertex 0 at the center of a 4-cycle 1-2-3-4
/// let rows = vec![
///     vec![1, 2, 3, 4],
///     vec![0, 2, 4],
///     vec![0, 1, 3],
///     vec![0, 2, 4],
///     vec![0, 1, 3],
/// ];
/// let neighbors = NeighborList::from_adjacency(rows).unwrap();
///
/// // Opposite corners inside: removing 0 would disconnect them
/// let values = [1.0, 1.0, 0.0, 1.0, 0.0];
/// assert!(!is_simple(0, &values, 0.5, &neighbors));
///
/// // Adjacent corners inside: they stay connected without 0
/// let values = [1.0, 1.0, 1.0, 0.0, 0.0];
/// assert!(is_simple(0, &values, 0.5, &neighbors));
/// ```
pub fn is_simple(vertex: usize, values: &[f64], threshold: f64, neighbors: &NeighborList) -> bool {
    is_simple_by(vertex, neighbors, |k| {
        values.get(k).is_some_and(|&x| x > threshold)
    })
}

/// Simple-point test with an arbitrary membership predicate.
///
/// Lets callers test against a derived field, such as the complement
/// `1 - values`, without materializing it.
pub fn is_simple_by<F>(vertex: usize, neighbors: &NeighborList, inside: F) -> bool
where
    F: Fn(usize) -> bool,
{
    let ring = neighbors.neighbors(vertex);
    let members: Vec<usize> = ring.iter().copied().filter(|&k| inside(k)).collect();
    let n_inside = members.len();
    let n_outside = ring.len() - n_inside;

    if n_inside == 0 || n_outside == 0 {
        return false;
    }
    if n_inside == 1 || n_outside == 1 {
        return true;
    }

    // Sorted so overlap can be checked by merging
    let reach: Vec<Vec<usize>> = members
        .iter()
        .map(|&j| {
            let mut set: Vec<usize> = neighbors
                .neighbors(j)
                .iter()
                .copied()
                .filter(|&k| k != vertex && inside(k))
                .collect();
            set.push(j);
            set.sort_unstable();
            set
        })
        .collect();

    let mut groups = DisjointSets::new(n_inside);
    for a in 0..n_inside {
        for b in (a + 1)..n_inside {
            if overlaps(&reach[a], &reach[b]) {
                groups.union(a, b);
            }
        }
    }
    groups.count() == 1
}

fn overlaps(a: &[usize], b: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

/// Union-find over `0..n` with path halving.
#[derive(Debug, Clone)]
struct DisjointSets {
    parent: Vec<usize>,
    count: usize,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            count: n,
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
            self.count -= 1;
        }
    }

    fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vertex 0 joined to every vertex of the cycle `1..=n`.
    fn wheel(n: usize) -> NeighborList {
        let mut rows = vec![(1..=n).collect::<Vec<_>>()];
        for i in 1..=n {
            let prev = if i == 1 { n } else { i - 1 };
            let next = if i == n { 1 } else { i + 1 };
            rows.push(vec![0, prev, next]);
        }
        NeighborList::from_adjacency(rows).unwrap()
    }

    fn field(n: usize, inside: &[usize]) -> Vec<f64> {
        let mut values = vec![0.0; n];
        for &k in inside {
            values[k] = 1.0;
        }
        values
    }

    #[test]
    fn test_single_inside_neighbor_is_simple() {
        let neighbors = wheel(5);
        let values = field(6, &[1]);
        assert!(is_simple(0, &values, 0.5, &neighbors));
    }

    #[test]
    fn test_single_outside_neighbor_is_simple() {
        let neighbors = wheel(5);
        let values = field(6, &[1, 2, 3, 4]);
        assert!(is_simple(0, &values, 0.5, &neighbors));
    }

    #[test]
    fn test_two_separate_pairs_not_simple() {
        let neighbors = wheel(6);
        let values = field(7, &[1, 2, 4, 5]);
        assert!(!is_simple(0, &values, 0.5, &neighbors));
    }

    #[test]
    fn test_connected_arc_is_simple() {
        let neighbors = wheel(6);
        let values = field(7, &[1, 2, 3]);
        assert!(is_simple(0, &values, 0.5, &neighbors));
    }

    #[test]
    fn test_one_sided_ring_not_simple() {
        let neighbors = wheel(6);
        assert!(!is_simple(0, &field(7, &[]), 0.5, &neighbors));
        assert!(!is_simple(0, &field(7, &[1, 2, 3, 4, 5, 6]), 0.5, &neighbors));
        // The tested vertex's own value is irrelevant
        assert!(!is_simple(0, &field(7, &[0]), 0.5, &neighbors));
    }

    #[test]
    fn test_groups_joined_outside_the_ring() {
        // Wheel of 6 plus vertex 7 bridging spokes 1 and 4
        let mut rows: Vec<Vec<usize>> = (0..7).map(|v| wheel(6).neighbors(v).to_vec()).collect();
        rows[1].push(7);
        rows[4].push(7);
        rows.push(vec![1, 4]);
        let neighbors = NeighborList::from_adjacency(rows).unwrap();

        let values = field(8, &[1, 4, 7]);
        assert!(is_simple(0, &values, 0.5, &neighbors));

        let values = field(8, &[1, 4]);
        assert!(!is_simple(0, &values, 0.5, &neighbors));
    }

    #[test]
    fn test_complement_predicate() {
        let neighbors = wheel(6);
        let values = field(7, &[1, 2, 4, 5]);
        // Complement has inside {3, 6}: two isolated singletons
        assert!(!is_simple_by(0, &neighbors, |k| 1.0 - values[k] > 0.5));

        let values = field(7, &[1, 2, 3, 4]);
        // Complement inside {5, 6}: one adjacent pair
        assert!(is_simple_by(0, &neighbors, |k| 1.0 - values[k] > 0.5));
    }

    #[test]
    fn test_threshold_is_strict() {
        let neighbors = wheel(4);
        let values = [0.0, 0.5, 0.9, 0.5, 0.5];
        // Only vertex 2 exceeds 0.5
        assert!(is_simple(0, &values, 0.5, &neighbors));
        assert!(!is_simple(0, &values, 0.95, &neighbors));
    }

    #[test]
    fn test_disjoint_sets() {
        let mut sets = DisjointSets::new(5);
        sets.union(0, 1);
        sets.union(3, 4);
        sets.union(1, 0);
        assert_eq!(sets.count(), 3);
        sets.union(4, 0);
        assert_eq!(sets.count(), 2);
        assert_eq!(sets.find(3), sets.find(1));
    }
}
