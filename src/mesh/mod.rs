//! Surface mesh storage and vertex adjacency.
//!
//! The extraction algorithms only ever need two things from a surface: vertex
//! positions (for distances) and which vertices share a face. [`Mesh`] holds
//! the former, [`NeighborList`] the latter. A neighbor list is built once per
//! mesh and passed explicitly to every stage that walks the graph.
//!
//! ```
//! use fundi::mesh::{Mesh, NeighborList};
//! use nalgebra::Point3;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//!
//! let mesh = Mesh::new(points, faces).unwrap();
//! let neighbors = NeighborList::build(&mesh);
//! assert_eq!(neighbors.degree(0), 3);
//! ```

mod neighbors;
mod surface;

pub use neighbors::{build_neighbors, build_neighbors_filtered, NeighborList};
pub use surface::Mesh;
