//! Vertex adjacency derived from triangle faces.

use std::collections::HashSet;

use nalgebra::Point3;

use super::surface::{validate_faces, Mesh};
use crate::error::{FundiError, Result};

/// Per-vertex neighbor sets of a triangle mesh.
///
/// Two vertices are neighbors when they share a face. Rows are sorted in
/// ascending vertex id, contain no duplicates and never contain the vertex
/// itself. The relation is symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    rows: Vec<Vec<usize>>,
}

impl NeighborList {
    /// Build the neighbor list of a mesh.
    pub fn build(mesh: &Mesh) -> Self {
        Self::build_filtered(mesh, |_| true)
    }

    /// Build a neighbor list from only those faces accepted by `keep_face`.
    ///
    /// Vertices that lose all their faces end up with an empty row. This is
    /// how fold segmentation restricts connectivity to triangles made
    /// mostly of seed vertices.
    pub fn build_filtered<F>(mesh: &Mesh, keep_face: F) -> Self
    where
        F: Fn(&[usize; 3]) -> bool,
    {
        let faces = mesh.faces().iter().filter(|f| keep_face(f));
        Self::from_face_iter(mesh.num_vertices(), faces)
    }

    /// Build a neighbor list from explicit adjacency rows.
    ///
    /// Rows are sorted and deduplicated. Self-loops, out-of-range ids and
    /// asymmetric relations are rejected.
    pub fn from_adjacency(rows: Vec<Vec<usize>>) -> Result<Self> {
        let n = rows.len();
        let mut rows = rows;
        for (v, row) in rows.iter_mut().enumerate() {
            row.sort_unstable();
            row.dedup();
            if row.contains(&v) {
                return Err(FundiError::InvalidAdjacency {
                    vertex: v,
                    reason: "vertex lists itself as a neighbor",
                });
            }
            if row.last().is_some_and(|&last| last >= n) {
                return Err(FundiError::InvalidAdjacency {
                    vertex: v,
                    reason: "neighbor id out of range",
                });
            }
        }
        let list = Self { rows };
        if let Some(v) = list.first_asymmetric_vertex() {
            return Err(FundiError::InvalidAdjacency {
                vertex: v,
                reason: "adjacency is not symmetric",
            });
        }
        Ok(list)
    }

    fn from_face_iter<'a>(n_vertices: usize, faces: impl Iterator<Item = &'a [usize; 3]>) -> Self {
        let mut sets: Vec<HashSet<usize>> = vec![HashSet::new(); n_vertices];
        for &[a, b, c] in faces {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                // Degenerate triangles repeat a vertex; never link it to itself
                if u != v {
                    sets[u].insert(v);
                    sets[v].insert(u);
                }
            }
        }
        let rows = sets
            .into_iter()
            .map(|set| {
                let mut row: Vec<usize> = set.into_iter().collect();
                row.sort_unstable();
                row
            })
            .collect();
        Self { rows }
    }

    /// Neighbors of a vertex, in ascending id order.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.rows[v]
    }

    /// Number of neighbors of a vertex.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.rows[v].len()
    }

    /// Number of vertices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Largest vertex degree, or 0 for an empty list.
    pub fn max_degree(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.rows.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Iterate over `(vertex, neighbors)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.rows.iter().enumerate().map(|(v, row)| (v, row.as_slice()))
    }

    /// Check that every edge is listed from both ends.
    pub fn is_symmetric(&self) -> bool {
        self.first_asymmetric_vertex().is_none()
    }

    fn first_asymmetric_vertex(&self) -> Option<usize> {
        self.iter().find_map(|(v, row)| {
            row.iter()
                .any(|&u| self.rows[u].binary_search(&v).is_err())
                .then_some(v)
        })
    }
}

/// Build the neighbor list for raw points and faces.
///
/// # Errors
///
/// Returns [`FundiError::EmptyMesh`] or [`FundiError::InvalidVertexIndex`]
/// if the faces do not describe a mesh over `points`.
///
/// # Example
///
/// ```
/// use fundi::mesh::build_neighbors;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
/// ];
/// let neighbors = build_neighbors(&points, &[[0, 1, 3], [0, 3, 2]]).unwrap();
/// assert_eq!(neighbors.neighbors(0), &[1, 2, 3]);
/// assert_eq!(neighbors.neighbors(1), &[0, 3]);
/// ```
pub fn build_neighbors(points: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<NeighborList> {
    validate_faces(points.len(), faces)?;
    Ok(NeighborList::from_face_iter(points.len(), faces.iter()))
}

/// Build vertex adjacency from only the faces accepted by `keep_face`.
///
/// See [`NeighborList::build_filtered`].
pub fn build_neighbors_filtered<F>(mesh: &Mesh, keep_face: F) -> NeighborList
where
    F: Fn(&[usize; 3]) -> bool,
{
    NeighborList::build_filtered(mesh, keep_face)
}
