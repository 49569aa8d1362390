use std::collections::BTreeMap;

use glam::Vec3;

use crate::core::mesh::Mesh;

/// Vertex-group correspondence service.
///
/// Given two meshes known to represent the same object, returns a mapping
/// from the full mesh's vertex-group index domain to the LOD mesh's. The
/// mapping is total over the full domain: groups with no usable counterpart
/// map to themselves. Implementations must be deterministic.
pub trait GroupSolver {
    fn match_groups(&self, full: &Mesh, lod: &Mesh) -> BTreeMap<u32, u32>;
}

/// Weighted centroid of one vertex group.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GroupStat {
    group: u32,
    centroid: Vec3,
    /// Share of the mesh's total influence weight carried by this group.
    weight_share: f32,
}

/// Default solver: per-group weighted centroids, nearest-candidate search.
///
/// For each full-model group the `candidates_count` nearest LOD group
/// centroids are shortlisted by distance, then the candidate whose share of
/// total skin weight is closest to the full group's share wins. Ties resolve
/// to the lower LOD group index.
#[derive(Debug, Clone)]
pub struct CentroidGroupSolver {
    pub candidates_count: usize,
}

impl Default for CentroidGroupSolver {
    fn default() -> Self {
        Self::new(4)
    }
}

impl CentroidGroupSolver {
    #[must_use]
    pub fn new(candidates_count: usize) -> Self {
        Self {
            candidates_count: candidates_count.max(1),
        }
    }
}

impl GroupSolver for CentroidGroupSolver {
    fn match_groups(&self, full: &Mesh, lod: &Mesh) -> BTreeMap<u32, u32> {
        let full_stats = group_stats(full);
        let lod_stats = group_stats(lod);

        let mut mapping = BTreeMap::new();
        for group in 0..full.group_count() {
            let stat = full_stats.iter().find(|s| s.group == group);
            let target = match stat {
                Some(stat) if !lod_stats.is_empty() => {
                    self.best_candidate(stat, &lod_stats)
                }
                // No weighted vertices on one side: keep the index as-is
                _ => group,
            };
            mapping.insert(group, target);
        }
        mapping
    }
}

impl CentroidGroupSolver {
    fn best_candidate(&self, full_stat: &GroupStat, lod_stats: &[GroupStat]) -> u32 {
        // Shortlist by centroid distance; lod_stats is sorted by group index,
        // so the stable sort keeps lower indices first on distance ties.
        let mut ranked: Vec<&GroupStat> = lod_stats.iter().collect();
        ranked.sort_by(|a, b| {
            let da = a.centroid.distance_squared(full_stat.centroid);
            let db = b.centroid.distance_squared(full_stat.centroid);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.candidates_count);

        // Earlier-wins selection on the weight-share criterion
        let mut best = ranked[0];
        let mut best_diff = (best.weight_share - full_stat.weight_share).abs();
        for candidate in &ranked[1..] {
            let diff = (candidate.weight_share - full_stat.weight_share).abs();
            if diff < best_diff {
                best = candidate;
                best_diff = diff;
            }
        }
        best.group
    }
}

/// Accumulate weighted centroids and weight shares per group.
///
/// Only groups touched by at least one positive weight appear; output is
/// sorted by group index.
fn group_stats(mesh: &Mesh) -> Vec<GroupStat> {
    let mut accumulated: BTreeMap<u32, (Vec3, f32)> = BTreeMap::new();
    for ((position, indices), weights) in mesh
        .positions
        .iter()
        .zip(&mesh.group_indices)
        .zip(&mesh.group_weights)
    {
        for (slot, &weight) in weights.iter().enumerate() {
            if weight > 0.0 {
                let entry = accumulated.entry(indices[slot]).or_insert((Vec3::ZERO, 0.0));
                entry.0 += *position * weight;
                entry.1 += weight;
            }
        }
    }

    let total_weight: f32 = accumulated.values().map(|(_, w)| w).sum();
    accumulated
        .into_iter()
        .filter(|(_, (_, weight))| *weight > 0.0)
        .map(|(group, (weighted_sum, weight))| GroupStat {
            group,
            centroid: weighted_sum / weight,
            weight_share: if total_weight > 0.0 {
                weight / total_weight
            } else {
                0.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One vertex fully bound to one group.
    fn bound_vertex(position: Vec3, group: u32) -> (Vec3, [u32; 4], [f32; 4]) {
        (position, [group, 0, 0, 0], [1.0, 0.0, 0.0, 0.0])
    }

    fn skinned_mesh(vertices: Vec<(Vec3, [u32; 4], [f32; 4])>) -> Mesh {
        let positions = vertices.iter().map(|v| v.0).collect();
        let indices = vertices.iter().map(|v| v.1).collect();
        let weights = vertices.iter().map(|v| v.2).collect();
        Mesh::new(positions).with_skinning(indices, weights)
    }

    #[test]
    fn test_identity_when_groups_align() {
        let full = skinned_mesh(vec![
            bound_vertex(Vec3::new(0.0, 0.0, 0.0), 0),
            bound_vertex(Vec3::new(10.0, 0.0, 0.0), 1),
        ]);
        let lod = skinned_mesh(vec![
            bound_vertex(Vec3::new(0.1, 0.0, 0.0), 0),
            bound_vertex(Vec3::new(9.9, 0.0, 0.0), 1),
        ]);

        let mapping = CentroidGroupSolver::default().match_groups(&full, &lod);
        assert_eq!(mapping, BTreeMap::from([(0, 0), (1, 1)]));
    }

    #[test]
    fn test_swapped_groups_detected() {
        let full = skinned_mesh(vec![
            bound_vertex(Vec3::new(0.0, 0.0, 0.0), 0),
            bound_vertex(Vec3::new(10.0, 0.0, 0.0), 1),
        ]);
        // Same geometry, but the LOD skeleton numbers the groups in reverse
        let lod = skinned_mesh(vec![
            bound_vertex(Vec3::new(0.0, 0.0, 0.0), 1),
            bound_vertex(Vec3::new(10.0, 0.0, 0.0), 0),
        ]);

        let mapping = CentroidGroupSolver::default().match_groups(&full, &lod);
        assert_eq!(mapping, BTreeMap::from([(0, 1), (1, 0)]));
    }

    #[test]
    fn test_total_over_full_domain() {
        // Group 1 exists in the domain but carries no weight
        let full = skinned_mesh(vec![
            bound_vertex(Vec3::ZERO, 0),
            bound_vertex(Vec3::new(4.0, 0.0, 0.0), 2),
        ]);
        let lod = skinned_mesh(vec![
            bound_vertex(Vec3::ZERO, 0),
            bound_vertex(Vec3::new(4.0, 0.0, 0.0), 2),
        ]);

        let mapping = CentroidGroupSolver::default().match_groups(&full, &lod);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[&1], 1);
    }

    #[test]
    fn test_unskinned_lod_maps_identity() {
        let full = skinned_mesh(vec![bound_vertex(Vec3::ZERO, 0)]);
        let lod = Mesh::new(vec![Vec3::ZERO]);

        let mapping = CentroidGroupSolver::default().match_groups(&full, &lod);
        assert_eq!(mapping, BTreeMap::from([(0, 0)]));
    }

    #[test]
    fn test_unskinned_full_yields_empty_mapping() {
        let full = Mesh::new(vec![Vec3::ZERO]);
        let lod = skinned_mesh(vec![bound_vertex(Vec3::ZERO, 0)]);
        assert!(CentroidGroupSolver::default()
            .match_groups(&full, &lod)
            .is_empty());
    }

    #[test]
    fn test_candidate_limit_respected() {
        // Nearest centroid belongs to group 5; with a single candidate the
        // weight-share tiebreak never sees the others.
        let full = skinned_mesh(vec![bound_vertex(Vec3::ZERO, 0)]);
        let lod = skinned_mesh(vec![
            bound_vertex(Vec3::new(0.1, 0.0, 0.0), 5),
            bound_vertex(Vec3::new(2.0, 0.0, 0.0), 1),
        ]);

        let mapping = CentroidGroupSolver::new(1).match_groups(&full, &lod);
        assert_eq!(mapping[&0], 5);
    }

    #[test]
    fn test_deterministic() {
        let full = skinned_mesh(vec![
            bound_vertex(Vec3::new(1.0, 2.0, 3.0), 0),
            bound_vertex(Vec3::new(-1.0, 0.5, 2.0), 1),
            bound_vertex(Vec3::new(0.0, -3.0, 1.0), 2),
        ]);
        let lod = skinned_mesh(vec![
            bound_vertex(Vec3::new(1.1, 2.0, 3.0), 2),
            bound_vertex(Vec3::new(-1.0, 0.4, 2.0), 0),
            bound_vertex(Vec3::new(0.1, -3.0, 1.0), 1),
        ]);

        let solver = CentroidGroupSolver::default();
        let first = solver.match_groups(&full, &lod);
        for _ in 0..3 {
            assert_eq!(solver.match_groups(&full, &lod), first);
        }
    }
}
