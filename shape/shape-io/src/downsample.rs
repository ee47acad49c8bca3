//! Point-count reduction.

use shape_types::PointGroup;

/// Reduces a point group to at most `target` points.
pub trait Downsampler {
    /// Returns a subset of `group` with `min(group.len(), target)` points.
    fn downsample(&self, group: &PointGroup, target: usize) -> PointGroup;
}

/// Farthest-point sampling.
///
/// Starts from point 0 and repeatedly picks the point farthest from
/// everything chosen so far. Ties go to the lowest index, so the result is
/// deterministic. No index is picked twice, even among duplicate points.
/// Runs in `O(N · target)`.
///
/// # Example
///
/// ```
/// use shape_io::{Downsampler, FarthestPointSampler};
/// use shape_types::PointGroup;
///
/// let line = PointGroup::from_rows(&[
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [2.0, 0.0, 0.0],
///     [10.0, 0.0, 0.0],
/// ]);
/// let picked = FarthestPointSampler.downsample(&line, 2);
/// assert_eq!(picked.to_rows(), vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FarthestPointSampler;

impl Downsampler for FarthestPointSampler {
    fn downsample(&self, group: &PointGroup, target: usize) -> PointGroup {
        let points = group.points();
        if target >= points.len() {
            return group.clone();
        }
        if target == 0 {
            return PointGroup::default();
        }

        let mut chosen = Vec::with_capacity(target);
        let mut taken = vec![false; points.len()];
        let mut nearest = vec![f64::INFINITY; points.len()];
        let mut current = 0;

        for _ in 0..target {
            taken[current] = true;
            chosen.push(points[current]);
            // duplicates sit at distance 0; only untaken indices compete
            let mut best: Option<(usize, f64)> = None;
            for (i, p) in points.iter().enumerate() {
                let d = (p - points[current]).norm_squared();
                if d < nearest[i] {
                    nearest[i] = d;
                }
                if !taken[i] && best.map_or(true, |(_, far)| nearest[i] > far) {
                    best = Some((i, nearest[i]));
                }
            }
            match best {
                Some((i, _)) => current = i,
                None => break,
            }
        }

        PointGroup::new(chosen)
    }
}

/// Downsamples `group` only if it holds more than `max_points`.
#[must_use]
pub fn cap_point_count<D: Downsampler>(
    sampler: &D,
    group: &PointGroup,
    max_points: usize,
) -> PointGroup {
    if group.len() > max_points {
        sampler.downsample(group, max_points)
    } else {
        group.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn grid(n: usize) -> PointGroup {
        (0..n)
            .flat_map(|i| (0..n).map(move |j| Point3::new(i as f64, j as f64, 0.0)))
            .collect()
    }

    #[test]
    fn test_output_size() {
        let g = grid(5);
        assert_eq!(FarthestPointSampler.downsample(&g, 7).len(), 7);
        assert_eq!(FarthestPointSampler.downsample(&g, 100).len(), 25);
        assert!(FarthestPointSampler.downsample(&g, 0).is_empty());
    }

    #[test]
    fn test_picks_are_distinct_members() {
        let g = grid(6);
        let out = FarthestPointSampler.downsample(&g, 10);
        for (k, p) in out.points().iter().enumerate() {
            assert!(g.points().contains(p));
            assert!(!out.points()[..k].contains(p));
        }
    }

    #[test]
    fn test_corners_first() {
        let out = FarthestPointSampler.downsample(&grid(4), 2);
        assert_eq!(out.to_rows(), vec![[0.0, 0.0, 0.0], [3.0, 3.0, 0.0]]);
    }

    #[test]
    fn test_duplicate_points_pick_distinct_indices() {
        let g = PointGroup::from_rows(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ]);
        let out = FarthestPointSampler.downsample(&g, 3);
        // 0, then 1, then every distance is 0 and index 2 is the lowest untaken
        assert_eq!(
            out.to_rows(),
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
        );

        let same = PointGroup::from_rows(&[[2.0, 2.0, 2.0]; 5]);
        assert_eq!(FarthestPointSampler.downsample(&same, 4).len(), 4);
    }

    #[test]
    fn test_cap_point_count() {
        let g = grid(3);
        assert_eq!(cap_point_count(&FarthestPointSampler, &g, 20), g);
        assert_eq!(cap_point_count(&FarthestPointSampler, &g, 4).len(), 4);
    }
}
