//! Triangle surface storage.

use nalgebra::Point3;

use crate::error::{FundiError, Result};

/// An immutable triangulated surface.
///
/// Vertex ids are dense indices into [`Mesh::points`]. Construction validates
/// that every face references an existing vertex; nothing about manifoldness
/// or orientation is assumed, since surfaces produced by marching cubes or
/// FreeSurfer occasionally carry degenerate triangles.
#[derive(Debug, Clone)]
pub struct Mesh {
    points: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    /// Build a mesh from vertex positions and triangle faces.
    ///
    /// # Errors
    ///
    /// - [`FundiError::EmptyMesh`] if there are no points or no faces
    /// - [`FundiError::InvalidVertexIndex`] if a face index is out of range
    ///
    /// # Example
    ///
    /// ```
    /// use fundi::mesh::Mesh;
    /// use nalgebra::Point3;
    ///
    /// let points = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.5, 1.0, 0.0),
    /// ];
    /// let mesh = Mesh::new(points, vec![[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.num_vertices(), 3);
    /// ```
    pub fn new(points: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        validate_faces(points.len(), &faces)?;
        Ok(Self { points, faces })
    }

    /// Build a mesh from raw coordinate triples.
    pub fn from_coords(coords: &[[f64; 3]], faces: Vec<[usize; 3]>) -> Result<Self> {
        let points = coords
            .iter()
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(points, faces)
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// All vertex positions.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// All triangles.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.points[v]
    }

    /// Euclidean distance between two vertices.
    #[inline]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        (self.points[a] - self.points[b]).norm()
    }

    /// Axis-aligned bounding box as (min, max).
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Mean length over the three edges of every face.
    ///
    /// Interior edges are counted once per incident face; the value is a
    /// scale reference, not an exact edge statistic.
    pub fn average_edge_length(&self) -> f64 {
        if self.faces.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .faces
            .iter()
            .map(|&[a, b, c]| self.distance(a, b) + self.distance(b, c) + self.distance(c, a))
            .sum();
        total / (3 * self.faces.len()) as f64
    }
}

/// Check that a face list is non-empty and only references `[0, n_vertices)`.
pub(crate) fn validate_faces(n_vertices: usize, faces: &[[usize; 3]]) -> Result<()> {
    if n_vertices == 0 || faces.is_empty() {
        return Err(FundiError::EmptyMesh {
            vertices: n_vertices,
            faces: faces.len(),
        });
    }
    for (fi, face) in faces.iter().enumerate() {
        if let Some(&vi) = face.iter().find(|&&vi| vi >= n_vertices) {
            return Err(FundiError::InvalidVertexIndex {
                face: fi,
                vertex: vi,
                n_vertices,
            });
        }
    }
    Ok(())
}
