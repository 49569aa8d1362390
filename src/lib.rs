//! # lod-matcher
//!
//! A library for matching the mesh components of a low-detail (LOD) model to
//! the components of its full-detail reference.
//!
//! Game asset pipelines often ship a model in several detail tiers whose
//! component ordering, naming, and bone indexing disagree. Transferring
//! per-vertex metadata (bone bindings, material assignments) from the full
//! model onto a LOD tier first requires knowing which component corresponds
//! to which.
//!
//! `lod-matcher` solves this with a two-tier strategy: components carrying
//! identical content hashes pair trivially, and everything else goes through
//! a coarse-to-fine geometric similarity search plus a vertex-group
//! correspondence solver. The result is a deterministic, one-to-one match
//! table keyed by full-model content hash.
//!
//! ## Features
//!
//! - **Hash-based matching**: content fingerprints give exact pairings first
//! - **Two-stage geometric fallback**: a cheap prefilter bounds the cost of
//!   the precise similarity stage
//! - **Vertex-group remapping**: detects when a LOD skeleton renumbers its
//!   groups and records the index mapping
//! - **Partial-data tolerance**: unreadable LOD components are excluded from
//!   candidacy without aborting the run
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
//!     println!("{hash} -> {} ({:.1}%)", record.lod_name, record.similarity * 100.0);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: component, mesh, and identity data types
//! - [`model`]: descriptors, buffer decoding, and model providers
//! - [`matching`]: the matching engine and its scoring/correspondence services
//! - [`cli`]: command-line interface implementation

pub mod cli;
pub mod core;
pub mod matching;
pub mod model;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::component::{ComponentRef, ComponentTable};
pub use core::mesh::{Mesh, MeshSlot};
pub use core::types::*;
pub use matching::engine::{
    CancelToken, LodMatcher, MatchError, MatchRecord, MatcherConfig, VertexGroupRemap,
};
pub use matching::groups::{CentroidGroupSolver, GroupSolver};
pub use matching::scoring::{ScoreResolution, SimilarityScorer, VoxelOverlapScorer};
pub use model::descriptor::ModelDescriptor;
pub use model::provider::{ExtractedObject, ModelDirectory, ModelProvider};
