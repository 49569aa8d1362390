use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::component::{ComponentRef, ComponentTable};
use crate::core::mesh::{Mesh, MeshSlot};
use crate::core::types::{Confidence, ContentHash, MatchMethod};
use crate::matching::groups::{CentroidGroupSolver, GroupSolver};
use crate::matching::scoring::{ScoreResolution, SimilarityScorer, VoxelOverlapScorer};
use crate::model::provider::{ModelProvider, ProviderError};

#[derive(Error, Debug)]
pub enum MatchError {
    /// Two full-model components share one content hash; the descriptor is
    /// corrupt and cannot be matched safely.
    #[error(
        "duplicate content hash {hash} in the full-model descriptor \
         (components `{first}` and `{second}`)"
    )]
    DuplicateHash {
        hash: ContentHash,
        first: String,
        second: String,
    },

    #[error("failed to load full-model mesh `{name}`")]
    FullMeshLoad {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("operation requires phase {expected:?}, but the matcher is in {actual:?}")]
    Phase { expected: Phase, actual: Phase },

    #[error("matching run cancelled")]
    Cancelled,
}

/// Run phases of the orchestrator.
///
/// Transitions are strictly sequential and non-restartable; a fresh matcher
/// is required per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    MetadataLoaded,
    MeshesLoaded,
    HashResolved,
    GeometricResolved,
    Done,
}

/// Configuration for one matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Precise scoring configuration for the final decision stage.
    pub fine: ScoreResolution,

    /// Cheap scoring configuration for the candidate prefilter.
    pub prefilter: ScoreResolution,

    /// Number of prefiltered candidates carried into the fine stage.
    pub prefilter_candidates: usize,

    /// Candidate shortlist size for the vertex-group solver.
    pub group_candidates: usize,

    /// Run the dedicated hash-resolution pass before geometric matching.
    pub hash_matching: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fine: ScoreResolution::fine(),
            prefilter: ScoreResolution::prefilter(),
            prefilter_candidates: 8,
            group_candidates: 4,
            hash_matching: true,
        }
    }
}

/// Cooperative cancellation flag, checked between full-component iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// LOD components not yet claimed by any match.
///
/// Entries keep the LOD table's insertion order so candidate ranking stays
/// deterministic. Claiming removes the entry, which is what enforces the
/// at-most-one-match invariant for every LOD component.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: Vec<(ContentHash, String)>,
}

impl CandidatePool {
    fn from_table(table: &ComponentTable) -> Self {
        let mut pool = Self::default();
        for component in table.iter() {
            match pool
                .entries
                .iter_mut()
                .find(|(hash, _)| *hash == component.hash)
            {
                // Duplicate LOD hash: later name wins, position kept
                Some(entry) => entry.1 = component.name.clone(),
                None => pool
                    .entries
                    .push((component.hash.clone(), component.name.clone())),
            }
        }
        pool
    }

    /// Remove and return the component holding `hash`, if still unclaimed.
    pub fn claim(&mut self, hash: &ContentHash) -> Option<String> {
        let position = self.entries.iter().position(|(h, _)| h == hash)?;
        Some(self.entries.remove(position).1)
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.iter().any(|(h, _)| h == hash)
    }

    /// Unclaimed entries in LOD-table order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &str)> {
        self.entries.iter().map(|(hash, name)| (hash, name.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final match for one full-model component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    /// Name of the claimed LOD component.
    pub lod_name: String,

    /// Content hash the LOD component was claimed under.
    pub lod_hash: ContentHash,

    /// Similarity between the pair. Informational for hash matches, the
    /// decision input for geometric ones.
    pub similarity: f32,

    /// How the match was decided.
    pub method: MatchMethod,

    /// Confidence band derived from the score.
    pub confidence: Confidence,
}

/// Vertex-group index remap for one matched pair.
///
/// Recorded only when at least one index actually changes; an identity-only
/// mapping means the LOD reuses the full skeleton and is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexGroupRemap {
    pub lod_hash: ContentHash,
    /// Full-model group index -> LOD group index, total over the full domain.
    pub mapping: BTreeMap<u32, u32>,
}

impl VertexGroupRemap {
    #[must_use]
    pub fn remapped_count(&self) -> usize {
        self.mapping.iter().filter(|(from, to)| from != to).count()
    }
}

/// The match orchestrator.
///
/// Owns the matching state machine: metadata and mesh loading over the
/// providers, hash resolution, the greedy two-stage geometric search, and
/// vertex-group correspondence recording. One instance performs exactly one
/// run.
pub struct LodMatcher<'a> {
    config: MatcherConfig,
    scorer: Box<dyn SimilarityScorer>,
    groups: Box<dyn GroupSolver>,
    cancel: CancelToken,

    full: &'a dyn ModelProvider,
    lod_sources: Vec<&'a dyn ModelProvider>,

    phase: Phase,
    full_components: ComponentTable,
    lod_components: ComponentTable,
    lod_origin: HashMap<String, usize>,
    pool: CandidatePool,
    full_meshes: HashMap<String, Mesh>,
    lod_meshes: HashMap<String, MeshSlot>,

    resolved: HashSet<String>,
    matches: BTreeMap<ContentHash, MatchRecord>,
    group_remaps: BTreeMap<ContentHash, VertexGroupRemap>,
}

impl<'a> LodMatcher<'a> {
    /// Create a matcher for one run against `full`, with default scorer and
    /// group solver.
    pub fn new(full: &'a dyn ModelProvider, config: MatcherConfig) -> Self {
        let groups = CentroidGroupSolver::new(config.group_candidates);
        Self {
            config,
            scorer: Box::new(VoxelOverlapScorer::default()),
            groups: Box::new(groups),
            cancel: CancelToken::default(),
            full,
            lod_sources: Vec::new(),
            phase: Phase::Idle,
            full_components: ComponentTable::new(),
            lod_components: ComponentTable::new(),
            lod_origin: HashMap::new(),
            pool: CandidatePool::default(),
            full_meshes: HashMap::new(),
            lod_meshes: HashMap::new(),
            resolved: HashSet::new(),
            matches: BTreeMap::new(),
            group_remaps: BTreeMap::new(),
        }
    }

    /// Add a LOD source. Sources merge in registration order; later sources
    /// win name collisions, so register in-memory extracted objects after an
    /// on-disk LOD model.
    #[must_use]
    pub fn with_lod_source(mut self, source: &'a dyn ModelProvider) -> Self {
        self.lod_sources.push(source);
        self
    }

    /// Replace the similarity scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: impl SimilarityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Replace the vertex-group solver.
    #[must_use]
    pub fn with_group_solver(mut self, solver: impl GroupSolver + 'static) -> Self {
        self.groups = Box::new(solver);
        self
    }

    /// Token for cancelling the run from another thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Match table so far, keyed by full-model content hash.
    #[must_use]
    pub fn matches(&self) -> &BTreeMap<ContentHash, MatchRecord> {
        &self.matches
    }

    /// Vertex-group remaps, keyed by full-model content hash.
    #[must_use]
    pub fn group_remaps(&self) -> &BTreeMap<ContentHash, VertexGroupRemap> {
        &self.group_remaps
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), MatchError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(MatchError::Phase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Load both component tables and build the candidate pool.
    ///
    /// # Errors
    ///
    /// Returns a provider error if any descriptor cannot be read.
    pub fn load_metadata(&mut self) -> Result<(), MatchError> {
        self.expect_phase(Phase::Idle)?;

        self.full_components = self.full.components()?;

        let mut lod = ComponentTable::new();
        for (index, source) in self.lod_sources.iter().enumerate() {
            let table = source.components()?;
            for component in table.iter() {
                self.lod_origin.insert(component.name.clone(), index);
            }
            lod.extend(table);
        }
        self.pool = CandidatePool::from_table(&lod);
        self.lod_components = lod;

        debug!(
            full = self.full_components.len(),
            lod = self.lod_components.len(),
            "component metadata loaded"
        );
        self.phase = Phase::MetadataLoaded;
        Ok(())
    }

    /// Load meshes for every component in both tables.
    ///
    /// A LOD component that fails to load is recorded as
    /// [`MeshSlot::Failed`] and excluded from candidacy; the run continues.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::FullMeshLoad` if any full-model mesh cannot be
    /// loaded; there is nothing to match without it.
    pub fn load_meshes(&mut self) -> Result<(), MatchError> {
        self.expect_phase(Phase::MetadataLoaded)?;

        for component in self.full_components.iter() {
            let mesh = self.full.load_mesh(&component.name).map_err(|source| {
                MatchError::FullMeshLoad {
                    name: component.name.clone(),
                    source,
                }
            })?;
            self.full_meshes.insert(component.name.clone(), mesh);
        }

        for component in self.lod_components.iter() {
            let Some(&origin) = self.lod_origin.get(&component.name) else {
                continue;
            };
            let slot = match self.lod_sources[origin].load_mesh(&component.name) {
                Ok(mesh) => MeshSlot::Loaded(mesh),
                Err(error) => {
                    warn!(
                        component = %component.name,
                        error = %error,
                        "failed to load LOD mesh; component excluded from candidacy"
                    );
                    MeshSlot::Failed
                }
            };
            self.lod_meshes.insert(component.name.clone(), slot);
        }

        debug!(
            full = self.full_meshes.len(),
            lod = self.lod_meshes.len(),
            failed = self
                .lod_meshes
                .values()
                .filter(|slot| slot.is_failed())
                .count(),
            "meshes loaded"
        );
        self.phase = Phase::MeshesLoaded;
        Ok(())
    }

    /// Claim every LOD component whose content hash equals a full
    /// component's hash.
    ///
    /// Runs before geometric resolution so unambiguous matches never compete
    /// for candidate slots. The similarity computed here is diagnostic only;
    /// the match is decided by hash equality.
    pub fn resolve_by_hash(&mut self) -> Result<(), MatchError> {
        self.expect_phase(Phase::MeshesLoaded)?;

        if self.config.hash_matching {
            let components: Vec<ComponentRef> = self.full_components.iter().cloned().collect();
            for component in components {
                let Some(lod_name) = self.pool.claim(&component.hash) else {
                    continue;
                };
                let Some(lod_mesh) = self.lod_meshes.get(&lod_name).and_then(MeshSlot::mesh)
                else {
                    // The claim is consumed: a component with no readable
                    // mesh can never match anything later either.
                    warn!(
                        full = %component.name,
                        lod = %lod_name,
                        "hash-matched LOD component has no readable mesh; no match recorded"
                    );
                    continue;
                };
                let Some(full_mesh) = self.full_meshes.get(&component.name) else {
                    continue;
                };

                let similarity = self.scorer.score(full_mesh, lod_mesh, &self.config.fine);
                info!(
                    full = %component.name,
                    lod = %lod_name,
                    hash = %component.hash,
                    remaining = self.pool.len(),
                    similarity,
                    "matched by hash"
                );
                self.resolved.insert(component.name.clone());
                self.matches.insert(
                    component.hash.clone(),
                    MatchRecord {
                        lod_name,
                        lod_hash: component.hash.clone(),
                        similarity,
                        method: MatchMethod::Hash,
                        confidence: Confidence::Exact,
                    },
                );
            }
        }

        self.phase = Phase::HashResolved;
        Ok(())
    }

    /// Resolve the remaining full components with the two-stage geometric
    /// search, then record vertex-group correspondences.
    ///
    /// The pass is greedy and order-dependent by design: full components are
    /// processed in descriptor order, and an earlier component claims its
    /// best candidate before a later one can compete for it.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::DuplicateHash` when a full component's hash was
    /// already claimed by a different component, and `MatchError::Cancelled`
    /// if the cancel token fires between components.
    pub fn resolve_by_geometry(&mut self) -> Result<(), MatchError> {
        self.expect_phase(Phase::HashResolved)?;
        let components: Vec<ComponentRef> = self.full_components.iter().cloned().collect();

        let Self {
            config,
            scorer,
            groups,
            cancel,
            pool,
            full_meshes,
            lod_meshes,
            resolved,
            matches,
            group_remaps,
            ..
        } = self;
        let scorer: &dyn SimilarityScorer = scorer.as_ref();
        let config: &MatcherConfig = config;

        for component in &components {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }
            if resolved.contains(&component.name) {
                continue;
            }
            if matches.contains_key(&component.hash) {
                let first = components
                    .iter()
                    .take_while(|other| other.name != component.name)
                    .find(|other| other.hash == component.hash)
                    .map_or_else(|| "<unknown>".to_string(), |other| other.name.clone());
                return Err(MatchError::DuplicateHash {
                    hash: component.hash.clone(),
                    first,
                    second: component.name.clone(),
                });
            }
            let Some(full_mesh) = full_meshes.get(&component.name) else {
                continue;
            };

            let claimed = if let Some(lod_name) = pool.claim(&component.hash) {
                // Hash still unclaimed (hash pass disabled or skipped):
                // shortcut past the geometric search.
                let Some(lod_mesh) = lod_meshes.get(&lod_name).and_then(MeshSlot::mesh) else {
                    warn!(
                        full = %component.name,
                        lod = %lod_name,
                        "hash-matched LOD component has no readable mesh; no match recorded"
                    );
                    continue;
                };
                let similarity = scorer.score(full_mesh, lod_mesh, &config.fine);
                info!(
                    full = %component.name,
                    lod = %lod_name,
                    hash = %component.hash,
                    remaining = pool.len(),
                    similarity,
                    "matched by hash"
                );
                (lod_name, component.hash.clone(), similarity, MatchMethod::Hash)
            } else {
                // Candidates still unclaimed and readable, in pool order
                let candidates: Vec<(ContentHash, String, &Mesh)> = pool
                    .iter()
                    .filter_map(|(hash, name)| {
                        lod_meshes
                            .get(name)
                            .and_then(MeshSlot::mesh)
                            .map(|mesh| (hash.clone(), name.to_string(), mesh))
                    })
                    .collect();
                if candidates.is_empty() {
                    info!(
                        full = %component.name,
                        "no viable candidates remain; component left unmatched"
                    );
                    continue;
                }

                // Coarse prefilter bounds the cost of the fine stage
                let coarse: Vec<f32> = candidates
                    .par_iter()
                    .map(|(_, _, mesh)| scorer.score(full_mesh, mesh, &config.prefilter))
                    .collect();
                let mut order: Vec<usize> = (0..candidates.len()).collect();
                order.sort_by(|&a, &b| {
                    coarse[b]
                        .partial_cmp(&coarse[a])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                order.truncate(config.prefilter_candidates.max(1));

                let fine: Vec<f32> = order
                    .par_iter()
                    .map(|&index| scorer.score(full_mesh, candidates[index].2, &config.fine))
                    .collect();

                // Earlier-wins on ties, in the order scores were produced
                let mut best = 0;
                for index in 1..fine.len() {
                    if fine[index] > fine[best] {
                        best = index;
                    }
                }
                let (lod_hash, lod_name, lod_mesh) = &candidates[order[best]];
                let similarity = fine[best];

                let _ = pool.claim(lod_hash);
                info!(
                    full = %component.name,
                    lod = %lod_name,
                    lod_hash = %lod_hash,
                    vertices = lod_mesh.vertex_count(),
                    remaining = pool.len(),
                    similarity,
                    "matched by geometry"
                );
                (
                    lod_name.clone(),
                    lod_hash.clone(),
                    similarity,
                    MatchMethod::Geometry,
                )
            };
            let (lod_name, lod_hash, similarity, method) = claimed;

            // Vertex-group correspondence for the matched pair
            if let Some(lod_mesh) = lod_meshes.get(&lod_name).and_then(MeshSlot::mesh) {
                let mapping = groups.match_groups(full_mesh, lod_mesh);
                let remapped = mapping.iter().filter(|(from, to)| from != to).count();
                if remapped > 0 {
                    debug!(
                        full = %component.name,
                        remapped,
                        total = mapping.len(),
                        "vertex groups remapped"
                    );
                    group_remaps.insert(
                        component.hash.clone(),
                        VertexGroupRemap {
                            lod_hash: lod_hash.clone(),
                            mapping,
                        },
                    );
                } else {
                    debug!(
                        full = %component.name,
                        total = mapping.len(),
                        "vertex groups aligned; LOD reuses the full skeleton"
                    );
                }
            }

            let confidence = match method {
                MatchMethod::Hash => Confidence::Exact,
                MatchMethod::Geometry => Confidence::from_score(similarity),
            };
            resolved.insert(component.name.clone());
            matches.insert(
                component.hash.clone(),
                MatchRecord {
                    lod_name,
                    lod_hash,
                    similarity,
                    method,
                    confidence,
                },
            );
        }

        self.phase = Phase::GeometricResolved;
        Ok(())
    }

    /// Drive a full run and return the match table.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error from any pass; see [`MatchError`].
    pub fn run(&mut self) -> Result<&BTreeMap<ContentHash, MatchRecord>, MatchError> {
        self.expect_phase(Phase::Idle)?;
        self.load_metadata()?;
        self.load_meshes()?;
        self.resolve_by_hash()?;
        self.resolve_by_geometry()?;
        self.phase = Phase::Done;

        info!(
            matches = self.matches.len(),
            remaps = self.group_remaps.len(),
            "matching run complete"
        );
        Ok(&self.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::ComponentRef;
    use crate::core::types::ContentHash;

    fn table(entries: &[(&str, &str)]) -> ComponentTable {
        entries
            .iter()
            .map(|(name, hash)| ComponentRef::new(*name, ContentHash::new(*hash)))
            .collect()
    }

    #[test]
    fn test_pool_claim_removes_entry() {
        let mut pool =
            CandidatePool::from_table(&table(&[("B", "aaaa0000"), ("C", "bbbb0000")]));
        assert_eq!(pool.len(), 2);

        let claimed = pool.claim(&ContentHash::new("aaaa0000"));
        assert_eq!(claimed.as_deref(), Some("B"));
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&ContentHash::new("aaaa0000")));

        // A second claim for the same hash finds nothing
        assert!(pool.claim(&ContentHash::new("aaaa0000")).is_none());
    }

    #[test]
    fn test_pool_keeps_table_order() {
        let pool = CandidatePool::from_table(&table(&[
            ("C", "cccc0000"),
            ("A", "aaaa0000"),
            ("B", "bbbb0000"),
        ]));
        let names: Vec<&str> = pool.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_pool_duplicate_hash_last_writer_wins() {
        let pool =
            CandidatePool::from_table(&table(&[("B", "aaaa0000"), ("C", "aaaa0000")]));
        assert_eq!(pool.len(), 1);
        let names: Vec<&str> = pool.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["C"]);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::default();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_remap_counts_non_identity_entries() {
        let remap = VertexGroupRemap {
            lod_hash: ContentHash::new("aaaa0000"),
            mapping: BTreeMap::from([(0, 0), (1, 2), (2, 1)]),
        };
        assert_eq!(remap.remapped_count(), 2);
    }

    #[test]
    fn test_default_config() {
        let config = MatcherConfig::default();
        assert!(config.hash_matching);
        assert!(config.prefilter_candidates > 0);
        assert!(config.prefilter.sample_count < config.fine.sample_count);
        assert!(config.prefilter.voxel_size > config.fine.voxel_size);
    }
}
