//! PLY (Stanford polygon) format support.
//!
//! Besides `x`, `y` and `z`, every numeric vertex property is read as a
//! scalar field, which is how depth and curvature maps usually travel with
//! a surface. Polygons with more than three corners are fan-triangulated.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::Surface;
use crate::error::{FundiError, Result};
use crate::mesh::Mesh;

const COORDINATES: [&str; 3] = ["x", "y", "z"];

/// Load a surface from a PLY file.
///
/// # Example
///
/// ```no_run
/// use fundi::io::ply;
///
/// let surface = ply::load("lh.pial.ply").unwrap();
/// println!("{} vertices", surface.mesh.num_vertices());
/// for name in surface.field_names() {
///     println!("field: {}", name);
/// }
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Surface> {
    let path = path.as_ref();
    let load_error = |message: String| FundiError::LoadError {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| load_error(e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element".to_string()))?;

    let mut points: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let mut xyz = [0.0; 3];
        for (value, name) in xyz.iter_mut().zip(COORDINATES) {
            *value = get_float_property(vertex, name)
                .ok_or_else(|| load_error(format!("vertex missing {} coordinate", name)))?;
        }
        points.push(Point3::new(xyz[0], xyz[1], xyz[2]));
    }

    let field_names: Vec<String> = ply
        .header
        .elements
        .get("vertex")
        .map(|element| {
            element
                .properties
                .keys()
                .filter(|name| !COORDINATES.contains(&name.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let mut fields = BTreeMap::new();
    for name in field_names {
        // List properties are not scalar fields
        let values: Option<Vec<f64>> = vertex_element
            .iter()
            .map(|vertex| get_float_property(vertex, &name))
            .collect();
        match values {
            Some(values) => {
                fields.insert(name, values);
            }
            None => log::debug!("skipping non-scalar vertex property '{}'", name),
        }
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element".to_string()))?;

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error("face missing vertex_indices property".to_string()))?;

        for i in 1..indices.len().saturating_sub(1) {
            faces.push([indices[0], indices[i], indices[i + 1]]);
        }
    }

    if faces.is_empty() {
        return Err(load_error("PLY file contains no faces".to_string()));
    }

    let mesh = Mesh::new(points, faces)?;
    log::debug!(
        "loaded {}: {} vertices, {} faces, {} fields",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces(),
        fields.len()
    );
    Ok(Surface { mesh, fields })
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh and per-vertex scalar fields to an ASCII PLY file.
///
/// Each field becomes a `double` vertex property.
///
/// # Example
///
/// ```no_run
/// use fundi::io::ply;
/// use fundi::mesh::Mesh;
///
/// let mesh = Mesh::from_coords(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![[0, 1, 2]]).unwrap();
/// let labels = [1.0, 1.0, 0.0];
/// ply::save("fundi.ply", &mesh, &[("fundus", &labels)]).unwrap();
/// ```
pub fn save<P: AsRef<Path>>(path: P, mesh: &Mesh, fields: &[(&str, &[f64])]) -> Result<()> {
    let path = path.as_ref();
    let n = mesh.num_vertices();
    for &(name, values) in fields {
        if values.len() != n {
            return Err(FundiError::field_length(name, n, values.len()));
        }
        if name.is_empty() || name.contains(char::is_whitespace) || COORDINATES.contains(&name) {
            return Err(FundiError::SaveError {
                path: path.to_path_buf(),
                message: format!("invalid vertex property name '{}'", name),
            });
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by fundi")?;
    writeln!(writer, "element vertex {}", n)?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    for (name, _) in fields {
        writeln!(writer, "property double {}", name)?;
    }
    writeln!(writer, "element face {}", mesh.num_faces())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (v, p) in mesh.points().iter().enumerate() {
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        for (_, values) in fields {
            write!(writer, " {}", values[v])?;
        }
        writeln!(writer)?;
    }

    for f in mesh.faces() {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::testing::grid_mesh;

    #[test]
    fn test_save_and_load_with_fields() {
        let mesh = grid_mesh(2);
        let depth: Vec<f64> = (0..9).map(|v| v as f64 * 0.25).collect();
        let labels = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 0.0, 1.0, 0.0];

        let path = std::env::temp_dir().join(format!("fundi_ply_{}.ply", std::process::id()));
        save(&path, &mesh, &[("depth", &depth), ("label", &labels)]).unwrap();
        let surface = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(surface.mesh.num_vertices(), 9);
        assert_eq!(surface.mesh.faces(), mesh.faces());
        assert_eq!(surface.field("depth").unwrap(), depth.as_slice());
        assert_eq!(surface.field("label").unwrap(), &labels);
        assert!((surface.mesh.position(8).x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_quads_are_triangulated() {
        let text = "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
                    property float z\nproperty float curv\nelement face 1\n\
                    property list uchar int vertex_indices\nend_header\n\
                    0 0 0 0.5\n1 0 0 -0.5\n1 1 0 0.25\n0 1 0 0\n4 0 1 2 3\n";
        let path = std::env::temp_dir().join(format!("fundi_quad_{}.ply", std::process::id()));
        std::fs::write(&path, text).unwrap();
        let surface = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(surface.mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(surface.field("curv").unwrap(), &[0.5, -0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_save_rejects_bad_fields() {
        let mesh = grid_mesh(1);
        let path = std::env::temp_dir().join("fundi_never_written.ply");
        assert!(matches!(
            save(&path, &mesh, &[("depth", &[0.0, 1.0])]),
            Err(FundiError::FieldLength { .. })
        ));
        assert!(save(&path, &mesh, &[("bad name", &[0.0; 4])]).is_err());
        assert!(save(&path, &mesh, &[("x", &[0.0; 4])]).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load("/nonexistent/surface.ply"),
            Err(FundiError::Io(_))
        ));
    }
}
