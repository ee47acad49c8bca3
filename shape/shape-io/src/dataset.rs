//! Per-tooth sample collections loaded from a directory of point files.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use shape_types::{Arch, PointGroup, Sample, Tag};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::txt::load_points;

/// Builds the conventional training tag set: every index in
/// `first..=last` combined with every arch in `arches`.
///
/// # Example
///
/// ```
/// use shape_io::training_tags;
/// use shape_types::{Arch, Tag};
///
/// let tags = training_tags(0, 129, &[Arch::Upper, Arch::Lower]);
/// assert_eq!(tags.len(), 260);
/// assert!(tags.contains(&Tag::new(37, Arch::Upper)));
/// ```
#[must_use]
pub fn training_tags(first: u32, last: u32, arches: &[Arch]) -> BTreeSet<Tag> {
    (first..=last)
        .flat_map(|i| arches.iter().map(move |&a| Tag::new(i, a)))
        .collect()
}

/// Samples of one tooth, sorted by ascending point count.
#[derive(Debug, Clone, Default)]
pub struct ToothDataset {
    samples: Vec<Sample>,
}

impl ToothDataset {
    /// Wraps samples, sorting them by point count (stable, so equal counts
    /// keep their order).
    #[must_use]
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(Sample::len);
        Self { samples }
    }

    /// Loads every `*.txt` file of `dir`; each file stem is the sample tag.
    ///
    /// Files are read in name order before sorting, so the result does not
    /// depend on directory iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyDirectory`] if no point file is found,
    /// [`StoreError::InvalidFileName`] for a stem that is not a tag, and any
    /// read or parse error.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "txt"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(StoreError::EmptyDirectory {
                path: dir.to_path_buf(),
            });
        }

        let mut samples = Vec::with_capacity(paths.len());
        for path in paths {
            let tag = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Tag>().ok())
                .ok_or_else(|| StoreError::InvalidFileName { path: path.clone() })?;
            let group = load_points(&path)?;
            debug!(%tag, points = group.len(), "Loaded sample");
            samples.push(Sample::new(tag, group));
        }

        let dataset = Self::new(samples);
        info!(
            dir = %dir.display(),
            samples = dataset.len(),
            min_points = dataset.samples.first().map_or(0, Sample::len),
            max_points = dataset.samples.last().map_or(0, Sample::len),
            "Loaded tooth dataset"
        );
        Ok(dataset)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in ascending point-count order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Consumes the dataset, returning its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    /// Tags in ascending point-count order.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.samples.iter().map(|s| s.tag).collect()
    }

    /// Looks up a sample's points by tag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TagNotFound`] if no sample has `tag`.
    pub fn get(&self, tag: Tag) -> StoreResult<&PointGroup> {
        self.samples
            .iter()
            .find(|s| s.tag == tag)
            .map(|s| &s.group)
            .ok_or(StoreError::TagNotFound(tag))
    }

    /// Applies `f` to every sample's points, keeping tags and re-sorting.
    #[must_use]
    pub fn map_groups<F>(self, f: F) -> Self
    where
        F: Fn(&PointGroup) -> PointGroup,
    {
        Self::new(
            self.samples
                .into_iter()
                .map(|s| Sample::new(s.tag, f(&s.group)))
                .collect(),
        )
    }

    /// Splits into `(training, test)` by membership in `training_tags`,
    /// preserving point-count order within each part.
    #[must_use]
    pub fn partition(&self, training_tags: &BTreeSet<Tag>) -> (Vec<Sample>, Vec<Sample>) {
        self.samples
            .iter()
            .cloned()
            .partition(|s| training_tags.contains(&s.tag))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::txt::save_points;

    fn group(n: usize) -> PointGroup {
        PointGroup::from_rows(&vec![[1.0, 2.0, 3.0]; n])
    }

    fn tag(s: &str) -> Tag {
        s.parse().unwrap()
    }

    #[test]
    fn test_sorted_by_point_count() {
        let ds = ToothDataset::new(vec![
            Sample::new(tag("1U"), group(5)),
            Sample::new(tag("2U"), group(2)),
            Sample::new(tag("3L"), group(9)),
        ]);
        assert_eq!(ds.tags(), vec![tag("2U"), tag("1U"), tag("3L")]);
    }

    #[test]
    fn test_get_and_missing_tag() {
        let ds = ToothDataset::new(vec![Sample::new(tag("7L"), group(3))]);
        assert_eq!(ds.get(tag("7L")).unwrap().len(), 3);
        assert!(matches!(
            ds.get(tag("7U")),
            Err(StoreError::TagNotFound(t)) if t == tag("7U")
        ));
    }

    #[test]
    fn test_partition_preserves_order() {
        let ds = ToothDataset::new(vec![
            Sample::new(tag("200U"), group(1)),
            Sample::new(tag("1U"), group(2)),
            Sample::new(tag("201L"), group(3)),
            Sample::new(tag("2L"), group(4)),
        ]);
        let training = training_tags(0, 129, &[Arch::Upper, Arch::Lower]);
        let (train, test) = ds.partition(&training);
        let train_tags: Vec<Tag> = train.iter().map(|s| s.tag).collect();
        let test_tags: Vec<Tag> = test.iter().map(|s| s.tag).collect();
        assert_eq!(train_tags, vec![tag("1U"), tag("2L")]);
        assert_eq!(test_tags, vec![tag("200U"), tag("201L")]);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        save_points(&group(4), dir.path().join("12U.txt")).unwrap();
        save_points(&group(2), dir.path().join("3L.txt")).unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let ds = ToothDataset::load_dir(dir.path()).unwrap();
        assert_eq!(ds.tags(), vec![tag("3L"), tag("12U")]);
    }

    #[test]
    fn test_load_dir_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        save_points(&group(1), dir.path().join("scan.txt")).unwrap();
        assert!(matches!(
            ToothDataset::load_dir(dir.path()),
            Err(StoreError::InvalidFileName { .. })
        ));
    }

    #[test]
    fn test_load_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ToothDataset::load_dir(dir.path()),
            Err(StoreError::EmptyDirectory { .. })
        ));
    }
}
