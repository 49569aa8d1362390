use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Fixed number of skinning influences carried per vertex, matching the
/// 4-wide blend index/weight attributes of GPU vertex buffers.
pub const MAX_INFLUENCES: usize = 4;

/// Structured geometry for one component.
///
/// Positions are mandatory; index data and skinning attributes are optional.
/// When skinning is present, `group_indices` and `group_weights` run parallel
/// to `positions`, one 4-wide influence slot set per vertex. A weight of zero
/// marks an unused slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,

    /// Triangle list indices; empty for raw vertex streams.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<u32>,

    /// Per-vertex group indices; empty when the component is unskinned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_indices: Vec<[u32; MAX_INFLUENCES]>,

    /// Per-vertex group weights, parallel to `group_indices`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_weights: Vec<[f32; MAX_INFLUENCES]>,
}

impl Mesh {
    #[must_use]
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    #[must_use]
    pub fn with_skinning(
        mut self,
        group_indices: Vec<[u32; MAX_INFLUENCES]>,
        group_weights: Vec<[f32; MAX_INFLUENCES]>,
    ) -> Self {
        self.group_indices = group_indices;
        self.group_weights = group_weights;
        self
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn has_skinning(&self) -> bool {
        !self.group_indices.is_empty() && !self.group_weights.is_empty()
    }

    /// Number of vertex groups referenced by at least one weighted influence.
    ///
    /// Computed as the highest referenced group index plus one, so unused
    /// intermediate indices still count toward the domain.
    #[must_use]
    pub fn group_count(&self) -> u32 {
        let mut max_group = None;
        for (indices, weights) in self.group_indices.iter().zip(&self.group_weights) {
            for (slot, &weight) in weights.iter().enumerate() {
                if weight > 0.0 {
                    let group = indices[slot];
                    max_group = Some(max_group.map_or(group, |m: u32| m.max(group)));
                }
            }
        }
        max_group.map_or(0, |m| m + 1)
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for &p in &self.positions[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }
}

/// Outcome of loading a LOD component's mesh.
///
/// A failed load is an explicit state, not an absence: later matching passes
/// skip `Failed` components instead of treating them as loadable candidates.
/// Full-model meshes are never stored in this form because a full-model load
/// failure aborts the run.
#[derive(Debug, Clone)]
pub enum MeshSlot {
    Loaded(Mesh),
    Failed,
}

impl MeshSlot {
    /// The mesh, if the load succeeded.
    #[must_use]
    pub fn mesh(&self) -> Option<&Mesh> {
        match self {
            Self::Loaded(mesh) => Some(mesh),
            Self::Failed => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}
