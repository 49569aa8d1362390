//! Component matching engine and its collaborating services.
//!
//! This module provides the core matching functionality:
//!
//! - [`LodMatcher`]: the match orchestrator and its state machine
//! - [`SimilarityScorer`] / [`VoxelOverlapScorer`]: geometric similarity
//! - [`GroupSolver`] / [`CentroidGroupSolver`]: vertex-group correspondence
//!
//! ## Matching Algorithm
//!
//! A run resolves matches in two tiers:
//!
//! 1. **Hash resolution**: full and LOD components sharing a content hash are
//!    paired immediately; similarity is computed only for reporting.
//! 2. **Geometric resolution**: every remaining full component runs a
//!    coarse-to-fine similarity search over the unclaimed candidates — a
//!    cheap prefilter ranks the whole pool, then the precise configuration
//!    rescores only the shortlist.
//!
//! The geometric pass is greedy and order-dependent on purpose: components
//! are processed in descriptor order, and each one claims its best candidate
//! before the next component competes. Claimed candidates leave the pool, so
//! no LOD component is ever matched twice.
//!
//! After each pairing the vertex-group solver derives a full-to-LOD group
//! index mapping; only non-identity mappings are recorded.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lod_matcher::{LodMatcher, MatcherConfig, ModelDirectory};
//!
//! let full = ModelDirectory::new("dumps/full");
//! let lod = ModelDirectory::new("dumps/lod");
//!
//! let mut matcher =
//!     LodMatcher::new(&full, MatcherConfig::default()).with_lod_source(&lod);
//! let matches = matcher.run().unwrap();
//!
//! for (hash, record) in matches {
//!     println!("{hash} -> {} ({:.2})", record.lod_name, record.similarity);
//! }
//! ```

pub mod engine;
pub mod groups;
pub mod scoring;

pub use engine::{
    CancelToken, CandidatePool, LodMatcher, MatchError, MatchRecord, MatcherConfig, Phase,
    VertexGroupRemap,
};
pub use groups::{CentroidGroupSolver, GroupSolver};
pub use scoring::{ScoreResolution, SimilarityScorer, VoxelOverlapScorer};
