use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::mesh::Mesh;

/// Safely convert usize to f32 for ratio calculations
///
/// Candidate pools and voxel sets are far below the f32 mantissa range, so
/// the precision loss is explicitly accepted.
#[inline]
fn count_to_f32(count: usize) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f32
    }
}

/// Resolution settings for one similarity pass.
///
/// A larger voxel size and a smaller sample count make the pass cheaper and
/// coarser; the prefilter runs with a coarse resolution and the final
/// decision with a fine one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResolution {
    /// Edge length of the occupancy grid cells, in model units.
    pub voxel_size: f32,
    /// Number of vertices sampled from each mesh.
    pub sample_count: usize,
}

impl ScoreResolution {
    /// Precise configuration for the final decision stage.
    #[must_use]
    pub fn fine() -> Self {
        Self {
            voxel_size: 0.05,
            sample_count: 2048,
        }
    }

    /// Cheap configuration for the candidate prefilter.
    #[must_use]
    pub fn prefilter() -> Self {
        Self {
            voxel_size: 0.25,
            sample_count: 256,
        }
    }
}

/// Geometric similarity service.
///
/// Implementations must be deterministic and return scores in `[0, 1]`,
/// higher meaning "more similar". The matching engine consumes this as a
/// black box; nothing downstream depends on the particular formula.
pub trait SimilarityScorer: Sync {
    fn score(&self, full: &Mesh, lod: &Mesh, resolution: &ScoreResolution) -> f32;
}

/// Default scorer: voxel-occupancy overlap blended with an extent ratio.
///
/// Both meshes are sampled with a deterministic stride, quantized onto a
/// shared grid of `voxel_size` cells, and compared by Jaccard overlap of the
/// occupied cells. The bounding-box diagonal ratio is blended in via
/// `sensitivity` so that co-located meshes of very different size do not
/// score as near-identical at coarse resolutions.
#[derive(Debug, Clone)]
pub struct VoxelOverlapScorer {
    /// Weight of the occupancy term versus the extent term, in `[0, 1]`.
    pub sensitivity: f32,
}

impl Default for VoxelOverlapScorer {
    fn default() -> Self {
        Self { sensitivity: 0.8 }
    }
}

impl VoxelOverlapScorer {
    #[must_use]
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity: sensitivity.clamp(0.0, 1.0),
        }
    }
}

impl SimilarityScorer for VoxelOverlapScorer {
    fn score(&self, full: &Mesh, lod: &Mesh, resolution: &ScoreResolution) -> f32 {
        if full.positions.is_empty() || lod.positions.is_empty() {
            return 0.0;
        }

        let voxel_size = resolution.voxel_size.max(1e-6);
        let full_cells = occupied_voxels(&full.positions, resolution.sample_count, voxel_size);
        let lod_cells = occupied_voxels(&lod.positions, resolution.sample_count, voxel_size);

        let occupancy = jaccard(&full_cells, &lod_cells);
        let extent = extent_ratio(full, lod);

        (self.sensitivity * occupancy + (1.0 - self.sensitivity) * extent).clamp(0.0, 1.0)
    }
}

/// Sample up to `sample_count` positions with an even stride.
///
/// Strided sampling keeps the scorer deterministic across runs; a random
/// subsample would break the bit-identical-output guarantee.
fn sample_positions(positions: &[Vec3], sample_count: usize) -> impl Iterator<Item = Vec3> + '_ {
    let stride = (positions.len() / sample_count.max(1)).max(1);
    positions.iter().step_by(stride).copied()
}

fn occupied_voxels(
    positions: &[Vec3],
    sample_count: usize,
    voxel_size: f32,
) -> HashSet<(i32, i32, i32)> {
    sample_positions(positions, sample_count)
        .map(|p| {
            (
                (p.x / voxel_size).floor() as i32,
                (p.y / voxel_size).floor() as i32,
                (p.z / voxel_size).floor() as i32,
            )
        })
        .collect()
}

/// Jaccard overlap: |A ∩ B| / |A ∪ B|, with empty sets scoring 0.0 to avoid
/// false positives from two degenerate meshes.
fn jaccard(a: &HashSet<(i32, i32, i32)>, b: &HashSet<(i32, i32, i32)>) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        count_to_f32(intersection) / count_to_f32(union)
    }
}

/// Ratio of bounding-box diagonal lengths, smaller over larger.
fn extent_ratio(a: &Mesh, b: &Mesh) -> f32 {
    let (Some((a_min, a_max)), Some((b_min, b_max))) = (a.bounds(), b.bounds()) else {
        return 0.0;
    };
    let a_diag = (a_max - a_min).length();
    let b_diag = (b_max - b_min).length();
    if a_diag <= 0.0 && b_diag <= 0.0 {
        // Two single-point meshes have no extent to compare
        return 1.0;
    }
    let larger = a_diag.max(b_diag);
    if larger <= 0.0 {
        return 0.0;
    }
    a_diag.min(b_diag) / larger
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_mesh(origin: Vec3, n: usize, spacing: f32) -> Mesh {
        let mut positions = Vec::new();
        for x in 0..n {
            for y in 0..n {
                positions.push(
                    origin + Vec3::new(count_to_f32(x) * spacing, count_to_f32(y) * spacing, 0.0),
                );
            }
        }
        Mesh::new(positions)
    }

    #[test]
    fn test_identical_meshes_score_high() {
        let scorer = VoxelOverlapScorer::default();
        let mesh = grid_mesh(Vec3::ZERO, 8, 0.1);
        let score = scorer.score(&mesh, &mesh, &ScoreResolution::fine());
        assert!(score > 0.99, "self-similarity was {score}");
    }

    #[test]
    fn test_distant_meshes_score_low() {
        let scorer = VoxelOverlapScorer::default();
        let a = grid_mesh(Vec3::ZERO, 8, 0.1);
        let b = grid_mesh(Vec3::new(100.0, 0.0, 0.0), 8, 0.1);
        let score = scorer.score(&a, &b, &ScoreResolution::fine());
        assert!(score < 0.5, "disjoint similarity was {score}");
    }

    #[test]
    fn test_closer_mesh_scores_higher() {
        let scorer = VoxelOverlapScorer::default();
        let full = grid_mesh(Vec3::ZERO, 8, 0.1);
        let near = grid_mesh(Vec3::new(0.02, 0.0, 0.0), 8, 0.1);
        let far = grid_mesh(Vec3::new(5.0, 0.0, 0.0), 8, 0.1);

        let resolution = ScoreResolution::fine();
        assert!(
            scorer.score(&full, &near, &resolution) > scorer.score(&full, &far, &resolution)
        );
    }

    #[test]
    fn test_empty_mesh_scores_zero() {
        let scorer = VoxelOverlapScorer::default();
        let mesh = grid_mesh(Vec3::ZERO, 4, 0.1);
        assert_eq!(
            scorer.score(&mesh, &Mesh::default(), &ScoreResolution::fine()),
            0.0
        );
        assert_eq!(
            scorer.score(&Mesh::default(), &Mesh::default(), &ScoreResolution::fine()),
            0.0
        );
    }

    #[test]
    fn test_score_bounded_and_deterministic() {
        let scorer = VoxelOverlapScorer::default();
        let a = grid_mesh(Vec3::ZERO, 10, 0.07);
        let b = grid_mesh(Vec3::new(0.3, -0.1, 0.2), 7, 0.11);

        let resolution = ScoreResolution::prefilter();
        let first = scorer.score(&a, &b, &resolution);
        assert!((0.0..=1.0).contains(&first));
        for _ in 0..3 {
            assert_eq!(scorer.score(&a, &b, &resolution), first);
        }
    }

    #[test]
    fn test_decimated_mesh_still_resembles_original() {
        let scorer = VoxelOverlapScorer::default();
        let full = grid_mesh(Vec3::ZERO, 10, 0.1);
        let decimated = Mesh::new(
            full.positions
                .iter()
                .step_by(3)
                .copied()
                .collect::<Vec<_>>(),
        );
        let other = grid_mesh(Vec3::new(3.0, 3.0, 0.0), 10, 0.1);

        let resolution = ScoreResolution::prefilter();
        assert!(
            scorer.score(&full, &decimated, &resolution)
                > scorer.score(&full, &other, &resolution)
        );
    }
}
