//! Model input layer: descriptors, raw buffers, and providers.
//!
//! This module owns everything between the filesystem (or a capture in
//! memory) and the matching engine's structured inputs:
//!
//! - [`descriptor`]: the `Metadata.json` companion descriptor with ordered
//!   per-component content hashes
//! - [`buffer`]: interleaved vertex/index buffer decoding and layouts
//! - [`provider`]: the [`provider::ModelProvider`] seam plus the on-disk and
//!   in-memory implementations

pub mod buffer;
pub mod descriptor;
pub mod provider;

pub use buffer::{IndexFormat, VertexLayout};
pub use descriptor::{ModelDescriptor, DESCRIPTOR_FILE};
pub use provider::{ComponentBuffers, ExtractedObject, ModelDirectory, ModelProvider, ProviderError};
