//! Plain-text scalar fields.
//!
//! One value per line, in vertex order. Blank lines and lines starting with
//! `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{FundiError, Result};

/// Load a scalar field.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut values = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let value = text.parse::<f64>().map_err(|e| FundiError::LoadError {
            path: path.to_path_buf(),
            message: format!("line {}: '{}': {}", number + 1, text, e),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Save a scalar field.
pub fn save<P: AsRef<Path>>(path: P, values: &[f64]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for v in values {
        writeln!(writer, "{}", v)?;
    }
    writer.flush()?;
    Ok(())
}
