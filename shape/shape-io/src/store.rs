//! On-disk stores for aligned shapes and their similarity transforms.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use shape_types::{Sample, SimilarityTransform, Tag};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::txt::{load_points, save_points};

/// Directory of aligned shapes, one `{tag}.txt` file per sample.
#[derive(Debug, Clone)]
pub struct AlignedShapeStore {
    dir: PathBuf,
}

impl AlignedShapeStore {
    /// Opens a store rooted at `dir`; nothing is touched until a save.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replaces the stored shapes with `samples`.
    ///
    /// Every `.txt` file already in the directory is removed first, so the
    /// store holds exactly this population afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on any file-system failure.
    pub fn save(&self, samples: &[Sample]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        for sample in samples {
            save_points(&sample.group, self.dir.join(format!("{}.txt", sample.tag)))?;
        }
        info!(
            dir = %self.dir.display(),
            saved = samples.len(),
            removed,
            "Saved aligned shapes"
        );
        Ok(())
    }

    /// Loads every stored shape with its tag, in tag order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidFileName`] for a stem that is not a tag,
    /// and any read or parse error.
    pub fn load(&self) -> StoreResult<Vec<Sample>> {
        let mut samples = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !(path.is_file() && path.extension().is_some_and(|e| e == "txt")) {
                continue;
            }
            let tag = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Tag>().ok())
                .ok_or_else(|| StoreError::InvalidFileName { path: path.clone() })?;
            samples.push(Sample::new(tag, load_points(&path)?));
        }
        samples.sort_by_key(|s| s.tag);
        debug!(dir = %self.dir.display(), loaded = samples.len(), "Loaded aligned shapes");
        Ok(samples)
    }
}

/// One stored similarity transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// Sample the transform belongs to.
    pub tag: Tag,
    /// Uniform scale.
    pub scale: f64,
    /// Rotation matrix rows.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl TransformRecord {
    /// Captures a transform.
    #[must_use]
    pub fn new(tag: Tag, transform: &SimilarityTransform) -> Self {
        let r = transform.rotation().matrix();
        let t = transform.translation();
        Self {
            tag,
            scale: transform.scale(),
            rotation: [
                [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
                [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
                [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
            ],
            translation: [t.x, t.y, t.z],
        }
    }

    /// Rebuilds the transform, validating the rotation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Shape`] if the stored values are not a valid
    /// similarity.
    pub fn to_transform(&self) -> StoreResult<SimilarityTransform> {
        let r = &self.rotation;
        let rotation = Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        );
        let t = self.translation;
        Ok(SimilarityTransform::from_matrix(
            self.scale,
            rotation,
            Vector3::new(t[0], t[1], t[2]),
        )?)
    }
}

/// Transforms of one tooth, in the order they were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformFile {
    /// Tooth the records belong to.
    pub tooth_index: u32,
    /// Records in production order.
    pub records: Vec<TransformRecord>,
}

impl TransformFile {
    /// Collects records for `tooth_index` from `(tag, transform)` pairs.
    #[must_use]
    pub fn new(tooth_index: u32, transforms: &[(Tag, SimilarityTransform)]) -> Self {
        Self {
            tooth_index,
            records: transforms
                .iter()
                .map(|(tag, t)| TransformRecord::new(*tag, t))
                .collect(),
        }
    }

    /// Tags in stored order.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.records.iter().map(|r| r.tag).collect()
    }

    /// Looks up the transform of `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TagNotFound`] if `tag` has no record.
    pub fn get(&self, tag: Tag) -> StoreResult<SimilarityTransform> {
        self.records
            .iter()
            .find(|r| r.tag == tag)
            .ok_or(StoreError::TagNotFound(tag))?
            .to_transform()
    }

    /// All transforms in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Shape`] for an invalid record.
    pub fn transforms(&self) -> StoreResult<Vec<(Tag, SimilarityTransform)>> {
        self.records
            .iter()
            .map(|r| Ok((r.tag, r.to_transform()?)))
            .collect()
    }
}

/// JSON file holding one tooth's [`TransformFile`].
#[derive(Debug, Clone)]
pub struct TransformStore {
    path: PathBuf,
}

impl TransformStore {
    /// Opens a store at `path`; nothing is touched until a save.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `file`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Json`] on failure.
    pub fn save(&self, file: &TransformFile) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, file)?;
        writer.flush()?;
        info!(
            path = %self.path.display(),
            tooth = file.tooth_index,
            records = file.records.len(),
            "Saved transform parameters"
        );
        Ok(())
    }

    /// Reads the stored transforms, checking they belong to `tooth_index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ToothMismatch`] for another tooth's file, and
    /// any read or parse error.
    pub fn load(&self, tooth_index: u32) -> StoreResult<TransformFile> {
        let reader = BufReader::new(File::open(&self.path)?);
        let file: TransformFile = serde_json::from_reader(reader)?;
        if file.tooth_index != tooth_index {
            return Err(StoreError::ToothMismatch {
                path: self.path.clone(),
                expected: tooth_index,
                found: file.tooth_index,
            });
        }
        Ok(file)
    }
}
