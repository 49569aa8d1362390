//! Core data types for components, meshes, and match identities.
//!
//! - [`types`]: content-hash newtype, match method, confidence bands
//! - [`component`]: component references and the ordered component table
//! - [`mesh`]: structured mesh geometry and the tagged load result

pub mod component;
pub mod mesh;
pub mod types;

pub use component::{ComponentRef, ComponentTable};
pub use mesh::{Mesh, MeshSlot, MAX_INFLUENCES};
pub use types::{Confidence, ContentHash, MatchMethod};
