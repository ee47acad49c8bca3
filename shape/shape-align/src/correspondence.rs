//! Greedy injective nearest-neighbour correspondence.
//!
//! Reference points are visited in index order. Each one claims the closest
//! moving point that no earlier reference point has claimed. The result is
//! injective by construction but not globally optimal: a reference point
//! whose true nearest neighbour was already taken falls back to the next
//! closest free one, however far away. This trade-off is deliberate and
//! keeps outputs identical to the established pipeline.

use nalgebra::DMatrix;
use shape_types::PointGroup;

use crate::{AlignError, AlignResult};

/// An injective mapping from reference indices to moving indices.
///
/// Entry `i` is the moving index matched to reference point `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence {
    moving_indices: Vec<usize>,
}

impl Correspondence {
    /// Moving index for each reference index, in reference order.
    #[must_use]
    pub fn moving_indices(&self) -> &[usize] {
        &self.moving_indices
    }

    /// `(reference, moving)` index pairs in reference order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.moving_indices.iter().copied().enumerate()
    }

    /// Number of pairs, equal to the reference cardinality.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moving_indices.len()
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moving_indices.is_empty()
    }

    /// Returns true if no moving index appears twice.
    #[must_use]
    pub fn is_injective(&self) -> bool {
        let mut seen = self.moving_indices.clone();
        seen.sort_unstable();
        seen.windows(2).all(|w| w[0] != w[1])
    }

    /// Gathers the matched points of `group`, in reference order.
    ///
    /// # Errors
    ///
    /// Returns an error if `group` is smaller than the moving set the
    /// mapping was built for.
    pub fn apply(&self, group: &PointGroup) -> AlignResult<PointGroup> {
        Ok(group.select(&self.moving_indices)?)
    }
}

/// Full pairwise Euclidean distance matrix, reference rows by moving columns.
#[must_use]
pub fn distance_matrix(reference: &PointGroup, moving: &PointGroup) -> DMatrix<f64> {
    let (x, y) = (reference.points(), moving.points());
    DMatrix::from_fn(x.len(), y.len(), |i, j| (x[i] - y[j]).norm())
}

/// Matches every reference point to a distinct moving point, greedily.
///
/// Ties resolve to the lowest moving index, so the result is deterministic.
///
/// # Errors
///
/// Returns [`AlignError::Cardinality`] if the reference has more points than
/// the moving set.
///
/// # Example
///
/// ```
/// use shape_align::extract_correspondence;
/// use shape_types::PointGroup;
///
/// let reference = PointGroup::from_rows(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
/// let moving = PointGroup::from_rows(&[[5.1, 0.0, 0.0], [9.0, 9.0, 9.0], [0.1, 0.0, 0.0]]);
///
/// let corr = extract_correspondence(&reference, &moving).unwrap();
/// assert_eq!(corr.moving_indices(), &[2, 0]);
/// ```
pub fn extract_correspondence(
    reference: &PointGroup,
    moving: &PointGroup,
) -> AlignResult<Correspondence> {
    if reference.len() > moving.len() {
        return Err(AlignError::Cardinality {
            reference: reference.len(),
            moving: moving.len(),
        });
    }

    let dist = distance_matrix(reference, moving);
    let mut available = vec![true; moving.len()];
    let mut moving_indices = Vec::with_capacity(reference.len());

    for i in 0..reference.len() {
        let mut best: Option<(usize, f64)> = None;
        for (j, free) in available.iter().enumerate() {
            if !free {
                continue;
            }
            let d = dist[(i, j)];
            if best.map_or(true, |(_, b)| d < b) {
                best = Some((j, d));
            }
        }
        // reference.len() <= moving.len() keeps a free column for every row
        let Some((j, _)) = best else {
            return Err(AlignError::Cardinality {
                reference: reference.len(),
                moving: moving.len(),
            });
        };
        available[j] = false;
        moving_indices.push(j);
    }

    Ok(Correspondence { moving_indices })
}
