use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::component::{ComponentRef, ComponentTable};
use crate::core::types::ContentHash;
use crate::utils::validation::{is_valid_content_hash, MAX_COMPONENTS};

/// File name of the companion descriptor inside a model directory.
pub const DESCRIPTOR_FILE: &str = "Metadata.json";

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("failed to read descriptor: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("descriptor lists {count} components, exceeding the maximum of {MAX_COMPONENTS}")]
    TooManyComponents { count: usize },

    #[error("component {index} carries an invalid content hash `{hash}`")]
    InvalidHash { index: usize, hash: String },
}

/// One component entry in a model descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// Content hash of the component's raw vertex-buffer bytes.
    pub vb0_hash: String,
}

/// Parsed companion descriptor for one model.
///
/// The descriptor carries an ordered component list; that ordering is
/// preserved into the [`ComponentTable`] and drives the greedy matching
/// order downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub components: Vec<ComponentEntry>,
}

impl ModelDescriptor {
    /// Load the descriptor from a model directory.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Read` if `Metadata.json` cannot be read, or
    /// any validation error from [`ModelDescriptor::from_json`].
    pub fn load(dir: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(dir.join(DESCRIPTOR_FILE))?;
        Self::from_json(&content)
    }

    /// Parse a descriptor from a JSON blob.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Parse` on malformed JSON,
    /// `TooManyComponents` past the component limit, and `InvalidHash` for
    /// entries whose hash is not hex.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(json)?;

        if descriptor.components.len() > MAX_COMPONENTS {
            return Err(DescriptorError::TooManyComponents {
                count: descriptor.components.len(),
            });
        }
        for (index, entry) in descriptor.components.iter().enumerate() {
            if !is_valid_content_hash(&entry.vb0_hash) {
                return Err(DescriptorError::InvalidHash {
                    index,
                    hash: entry.vb0_hash.clone(),
                });
            }
        }

        Ok(descriptor)
    }

    /// Component table with the standalone naming scheme `Component {i}`.
    #[must_use]
    pub fn component_table(&self) -> ComponentTable {
        self.components
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                ComponentRef::new(format!("Component {i}"), ContentHash::new(&entry.vb0_hash))
            })
            .collect()
    }

    /// Component table with composite names `{object_id} - Component {i}`.
    ///
    /// Used for in-memory extracted objects so that several objects can merge
    /// into one LOD table without name collisions.
    #[must_use]
    pub fn component_table_for(&self, object_id: &str) -> ComponentTable {
        self.components
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                ComponentRef::new(
                    component_name_for(object_id, i),
                    ContentHash::new(&entry.vb0_hash),
                )
            })
            .collect()
    }
}

/// Composite component name for one extracted object.
#[must_use]
pub fn component_name_for(object_id: &str, index: usize) -> String {
    format!("{object_id} - Component {index}")
}
