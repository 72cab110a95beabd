//! Geodesic distances along mesh edges.
//!
//! Dijkstra's algorithm over the vertex graph, with each edge weighted by its
//! Euclidean length. This is exact on the edge graph and approximates the
//! true surface geodesic from above. Searches can be confined to a vertex
//! subset (typically one fold) and cut off at a maximum radius.
//!
//! # Example
//!
//! ```
//! use fundi::algo::geodesic::{dijkstra, DijkstraOptions};
//! use fundi::mesh::NeighborList;
//! use nalgebra::Point3;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//! ];
//! let neighbors = NeighborList::from_adjacency(vec![vec![1], vec![0, 2], vec![1]]).unwrap();
//!
//! let result = dijkstra(&points, &neighbors, &[0], None, &DijkstraOptions::default());
//! assert_eq!(result.distance(2), 2.0);
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use nalgebra::Point3;

use crate::mesh::NeighborList;

/// Options for Dijkstra's algorithm.
#[derive(Debug, Clone, Default)]
pub struct DijkstraOptions {
    /// Vertices farther than this are not expanded. `None` for no limit.
    pub max_distance: Option<f64>,

    /// Stop as soon as this vertex is settled.
    pub target: Option<usize>,
}

impl DijkstraOptions {
    /// Set maximum distance to explore.
    pub fn with_max_distance(mut self, max_dist: f64) -> Self {
        self.max_distance = Some(max_dist);
        self
    }

    /// Set target vertex for early termination.
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }
}

/// Distances from the source set to every vertex.
#[derive(Debug, Clone)]
pub struct GeodesicResult {
    /// `f64::INFINITY` where the vertex was not reached.
    distances: Vec<f64>,
}

impl GeodesicResult {
    /// Distance to a vertex.
    #[inline]
    pub fn distance(&self, v: usize) -> f64 {
        self.distances[v]
    }

    /// All distances.
    #[inline]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Check if a vertex was reached.
    #[inline]
    pub fn is_reachable(&self, v: usize) -> bool {
        self.distances[v].is_finite()
    }

    /// Count reached vertices.
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }
}

#[derive(Debug, Clone)]
struct HeapEntry {
    vertex: usize,
    distance: f64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other.distance.total_cmp(&self.distance)
    }
}

/// Compute edge-graph distances from a set of sources.
///
/// # Arguments
///
/// * `points` - Vertex positions, one per neighbor list row
/// * `neighbors` - Vertex adjacency
/// * `sources` - Vertices at distance 0; out-of-range ids are ignored
/// * `allowed` - If given, paths may only visit vertices marked `true`
///   (sources outside the mask are ignored)
/// * `options` - Search limits
pub fn dijkstra(
    points: &[Point3<f64>],
    neighbors: &NeighborList,
    sources: &[usize],
    allowed: Option<&[bool]>,
    options: &DijkstraOptions,
) -> GeodesicResult {
    let n = neighbors.len().min(points.len());
    let mut distances = vec![f64::INFINITY; n];
    let is_allowed = |v: usize| allowed.map_or(true, |mask| mask.get(v).copied().unwrap_or(false));

    let mut heap = BinaryHeap::new();
    for &s in sources {
        if s < n && is_allowed(s) {
            distances[s] = 0.0;
            heap.push(HeapEntry {
                vertex: s,
                distance: 0.0,
            });
        }
    }

    while let Some(HeapEntry { vertex: u, distance }) = heap.pop() {
        // Stale entry
        if distance > distances[u] {
            continue;
        }
        if options.target == Some(u) {
            break;
        }
        if options.max_distance.is_some_and(|max| distance > max) {
            continue;
        }

        for &v in neighbors.neighbors(u) {
            if v >= n || !is_allowed(v) {
                continue;
            }
            let candidate = distance + (points[u] - points[v]).norm();
            if candidate < distances[v] {
                distances[v] = candidate;
                heap.push(HeapEntry {
                    vertex: v,
                    distance: candidate,
                });
            }
        }
    }

    GeodesicResult { distances }
}

/// Edge-graph distance between two vertices, `f64::INFINITY` if disconnected.
pub fn geodesic_distance(
    points: &[Point3<f64>],
    neighbors: &NeighborList,
    a: usize,
    b: usize,
    allowed: Option<&[bool]>,
) -> f64 {
    let options = DijkstraOptions::default().with_target(b);
    let result = dijkstra(points, neighbors, &[a], allowed, &options);
    result.distances.get(b).copied().unwrap_or(f64::INFINITY)
}

/// Vertices strictly closer than `radius` to `source`, with their distances.
///
/// Only touches the vertices it reaches, so the cost is bounded by the size
/// of the neighborhood rather than the mesh. Paths may only visit vertices
/// accepted by `allowed`; a source it rejects reaches nothing. Results are
/// sorted by vertex id.
pub fn within_radius<F>(
    points: &[Point3<f64>],
    neighbors: &NeighborList,
    source: usize,
    radius: f64,
    allowed: F,
) -> Vec<(usize, f64)>
where
    F: Fn(usize) -> bool,
{
    let n = neighbors.len().min(points.len());
    if source >= n || !allowed(source) || radius.is_nan() || radius <= 0.0 {
        return Vec::new();
    }

    let mut distances: HashMap<usize, f64> = HashMap::new();
    distances.insert(source, 0.0);
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        vertex: source,
        distance: 0.0,
    });

    while let Some(HeapEntry { vertex: u, distance }) = heap.pop() {
        if distances.get(&u).is_some_and(|&best| distance > best) {
            continue;
        }
        for &v in neighbors.neighbors(u) {
            if v >= n || !allowed(v) {
                continue;
            }
            let candidate = distance + (points[u] - points[v]).norm();
            if candidate >= radius {
                continue;
            }
            if distances.get(&v).map_or(true, |&best| candidate < best) {
                distances.insert(v, candidate);
                heap.push(HeapEntry {
                    vertex: v,
                    distance: candidate,
                });
            }
        }
    }

    let mut reached: Vec<(usize, f64)> = distances.into_iter().collect();
    reached.sort_unstable_by_key(|&(v, _)| v);
    reached
}
