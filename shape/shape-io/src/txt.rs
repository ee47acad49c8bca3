//! Plain-text point files: one `x y z` point per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use shape_types::PointGroup;

use crate::error::{StoreError, StoreResult};

/// Loads a point group from a whitespace-separated text file.
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read and
/// [`StoreError::InvalidContent`] for a line that is not three reals.
pub fn load_points<P: AsRef<Path>>(path: P) -> StoreResult<PointGroup> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let invalid = |message: String| StoreError::InvalidContent {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        };
        let values = trimmed
            .split_whitespace()
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|e| invalid(format!("{t:?} is not a number: {e}")))
            })
            .collect::<StoreResult<Vec<f64>>>()?;
        let [x, y, z] = values[..] else {
            return Err(invalid(format!("expected 3 values, found {}", values.len())));
        };
        points.push(Point3::new(x, y, z));
    }

    Ok(PointGroup::new(points))
}

/// Saves a point group, one point per line in `%.18e` notation.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be written.
pub fn save_points<P: AsRef<Path>>(group: &PointGroup, path: P) -> StoreResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for p in group.points() {
        writeln!(writer, "{:.18e} {:.18e} {:.18e}", p.x, p.y, p.z)?;
    }
    writer.flush()?;
    Ok(())
}
