//! Seeded region growing over the vertex graph.
//!
//! Splits a subset of mesh vertices ("seeds") into connected components,
//! where connectivity is restricted to paths that stay inside the seed set.
//! Components smaller than a minimum size are left unsegmented.
//!
//! Growth is breadth-first from the lowest remaining seed id, so identical
//! input always produces identical segment numbering.
//!
//! # Example
//!
//! ```
//! use fundi::algo::region::grow_regions;
//! use fundi::mesh::NeighborList;
//!
//! // Path graph 0-1-2-3-4
//! let rows = vec![vec![1], vec![0, 2], vec![1, 3], vec![2, 4], vec![3]];
//! let neighbors = NeighborList::from_adjacency(rows).unwrap();
//!
//! // Seeds {0, 1, 3, 4}: vertex 2 is missing, so there are two components
//! let segmentation = grow_regions(&[0, 1, 3, 4], &neighbors, 1);
//! assert_eq!(segmentation.num_segments(), 2);
//! assert_eq!(segmentation.segment(0), &[0, 1]);
//! assert_eq!(segmentation.segment(1), &[3, 4]);
//! ```

use std::collections::VecDeque;

use crate::mesh::NeighborList;

/// Result of region growing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Vertices of each retained segment, ascending.
    segments: Vec<Vec<usize>>,
    /// Segment id for each mesh vertex, `None` for background.
    segment_of_vertex: Vec<Option<usize>>,
    /// Id of the largest segment (first one wins ties).
    largest: Option<usize>,
}

impl Segmentation {
    /// Number of retained segments.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Check if no segment was retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Vertices of a segment, in ascending id order.
    #[inline]
    pub fn segment(&self, id: usize) -> &[usize] {
        &self.segments[id]
    }

    /// All segments.
    #[inline]
    pub fn segments(&self) -> &[Vec<usize>] {
        &self.segments
    }

    /// Segment containing `v`, if any.
    #[inline]
    pub fn segment_of(&self, v: usize) -> Option<usize> {
        self.segment_of_vertex[v]
    }

    /// Per-vertex segment assignment.
    #[inline]
    pub fn assignment(&self) -> &[Option<usize>] {
        &self.segment_of_vertex
    }

    /// Id of the largest segment.
    #[inline]
    pub fn largest(&self) -> Option<usize> {
        self.largest
    }

    /// Total number of segmented vertices.
    pub fn num_segmented(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Consume into the segment vertex lists.
    pub fn into_segments(self) -> Vec<Vec<usize>> {
        self.segments
    }
}

/// Grow connected segments from a seed set.
///
/// # Arguments
///
/// * `seeds` - Vertices eligible for segmentation. Order and duplicates do
///   not matter; ids outside the neighbor list are ignored.
/// * `neighbors` - Vertex adjacency of the mesh
/// * `min_component_size` - Components with fewer vertices stay background
///
/// # Returns
///
/// A [`Segmentation`] whose segments are pairwise disjoint subsets of the
/// seed set. An empty seed set yields no segments.
pub fn grow_regions(
    seeds: &[usize],
    neighbors: &NeighborList,
    min_component_size: usize,
) -> Segmentation {
    let n = neighbors.len();

    let mut is_seed = vec![false; n];
    for &s in seeds.iter().filter(|&&s| s < n) {
        is_seed[s] = true;
    }
    let mut remaining = is_seed.iter().filter(|&&s| s).count();

    let mut visited = vec![false; n];
    let mut segment_of_vertex = vec![None; n];
    let mut segments: Vec<Vec<usize>> = Vec::new();
    let mut largest: Option<usize> = None;
    let mut queue = VecDeque::new();

    for start in 0..n {
        // Nothing left can reach the minimum size
        if remaining == 0 || remaining < min_component_size {
            break;
        }
        if !is_seed[start] || visited[start] {
            continue;
        }

        let mut component = vec![start];
        visited[start] = true;
        queue.push_back(start);

        while let Some(u) = queue.pop_front() {
            for &w in neighbors.neighbors(u) {
                if is_seed[w] && !visited[w] {
                    visited[w] = true;
                    component.push(w);
                    queue.push_back(w);
                }
            }
        }

        remaining -= component.len();

        if component.len() >= min_component_size {
            component.sort_unstable();
            let id = segments.len();
            for &v in &component {
                segment_of_vertex[v] = Some(id);
            }
            if largest.map_or(true, |l| component.len() > segments[l].len()) {
                largest = Some(id);
            }
            log::trace!(
                "segment {}: {} vertices, {} seeds remaining",
                id,
                component.len(),
                remaining
            );
            segments.push(component);
        }
    }

    Segmentation {
        segments,
        segment_of_vertex,
        largest,
    }
}
