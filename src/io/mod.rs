//! Surface and scalar-field file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | PLY | `.ply` | ✓ | ✓ | Mesh plus per-vertex scalar properties |
//! | Plain text | `.txt` | ✓ | ✓ | One scalar value per line |
//!
//! # Usage
//!
//! ```no_run
//! use fundi::io::{load_surface, scalars};
//!
//! // Depth and curvature stored as vertex properties
//! let surface = load_surface("lh.pial.ply").unwrap();
//! let depth = surface.field("depth").unwrap();
//!
//! // Or kept next to the mesh as plain text
//! let curvature = scalars::load("lh.curv.txt").unwrap();
//! ```

pub mod ply;
pub mod scalars;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{FundiError, Result};
use crate::mesh::Mesh;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PLY (Stanford polygon) format.
    Ply,
    /// Plain-text scalar field.
    Text,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(Format::Ply),
            "txt" => Some(Format::Text),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

/// A mesh together with named per-vertex scalar fields.
#[derive(Debug, Clone)]
pub struct Surface {
    /// The triangle mesh.
    pub mesh: Mesh,
    /// Scalar fields by name, one value per vertex.
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl Surface {
    /// Wrap a mesh without fields.
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            fields: BTreeMap::new(),
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Result<&[f64]> {
        self.fields
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FundiError::MissingField {
                name: name.to_string(),
            })
    }

    /// Add or replace a field.
    pub fn insert_field(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        let n = self.mesh.num_vertices();
        if values.len() != n {
            return Err(FundiError::field_length(name, n, values.len()));
        }
        self.fields.insert(name, values);
        Ok(())
    }

    /// Names of the available fields, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| FundiError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a surface with automatic format detection.
pub fn load_surface<P: AsRef<Path>>(path: P) -> Result<Surface> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Ply => ply::load(path),
        Format::Text => Err(FundiError::LoadError {
            path: path.to_path_buf(),
            message: "plain-text files hold scalar fields, not surfaces".to_string(),
        }),
    }
}

/// Save a mesh and per-vertex fields with automatic format detection.
pub fn save_surface<P: AsRef<Path>>(path: P, mesh: &Mesh, fields: &[(&str, &[f64])]) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Ply => ply::save(path, mesh, fields),
        Format::Text => Err(FundiError::SaveError {
            path: path.to_path_buf(),
            message: "plain-text files hold scalar fields, not surfaces".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::testing::grid_mesh;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/lh.pial.PLY"), Some(Format::Ply));
        assert_eq!(Format::from_path("depth.txt"), Some(Format::Text));
        assert_eq!(Format::from_path("mesh.vtk"), None);
        assert_eq!(Format::from_path("noext"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_surface("surface.vtk").unwrap_err();
        assert!(matches!(err, FundiError::UnsupportedFormat { ref extension } if extension == "vtk"));
        assert!(load_surface("depth.txt").is_err());
    }

    #[test]
    fn test_surface_fields() {
        let mut surface = Surface::new(grid_mesh(1));
        surface.insert_field("depth", vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(surface.field("depth").unwrap()[2], 2.0);
        assert!(matches!(surface.field("curv"), Err(FundiError::MissingField { .. })));
        assert!(surface.insert_field("curv", vec![0.0]).is_err());
        assert_eq!(surface.field_names().collect::<Vec<_>>(), vec!["depth"]);
    }
}
