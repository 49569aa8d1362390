use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::component::ComponentTable;
use crate::core::mesh::Mesh;
use crate::model::buffer::{decode_index_buffer, decode_vertex_buffer, BufferError, VertexLayout};
use crate::model::descriptor::{component_name_for, DescriptorError, ModelDescriptor};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layout sidecar `{path}`")]
    Layout {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode buffers for `{name}`")]
    Buffer {
        name: String,
        #[source]
        source: BufferError,
    },

    #[error("unknown component `{name}`")]
    UnknownComponent { name: String },
}

/// A source of model components: descriptor hashes plus mesh payloads.
///
/// The two methods mirror the external Metadata Provider and Mesh Provider
/// interfaces. `components` must preserve descriptor ordering, since that
/// ordering drives the greedy matching order.
pub trait ModelProvider {
    /// Ordered component table for this model.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be read or parsed.
    fn components(&self) -> Result<ComponentTable, ProviderError>;

    /// Load the mesh for a named component.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown or its buffers cannot be
    /// read or decoded.
    fn load_mesh(&self, name: &str) -> Result<Mesh, ProviderError>;
}

/// An on-disk model: a directory holding `Metadata.json` plus per-component
/// `{name}.vb` vertex buffers, with optional `{name}.fmt` layout sidecars and
/// `{name}.ib` index buffers.
#[derive(Debug, Clone)]
pub struct ModelDirectory {
    root: PathBuf,
}

impl ModelDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, file: String) -> Result<Vec<u8>, ProviderError> {
        let path = self.root.join(file);
        std::fs::read(&path).map_err(|source| ProviderError::Io { path, source })
    }

    fn layout_for(&self, name: &str) -> Result<VertexLayout, ProviderError> {
        let path = self.root.join(format!("{name}.fmt"));
        if !path.exists() {
            return Ok(VertexLayout::default());
        }
        let content =
            std::fs::read_to_string(&path).map_err(|source| ProviderError::Io {
                path: path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ProviderError::Layout { path, source })
    }
}

impl ModelProvider for ModelDirectory {
    fn components(&self) -> Result<ComponentTable, ProviderError> {
        Ok(ModelDescriptor::load(&self.root)?.component_table())
    }

    fn load_mesh(&self, name: &str) -> Result<Mesh, ProviderError> {
        let layout = self.layout_for(name)?;
        let vb = self.read(format!("{name}.vb"))?;
        let mut mesh = decode_vertex_buffer(&vb, &layout).map_err(|source| {
            ProviderError::Buffer {
                name: name.to_string(),
                source,
            }
        })?;

        let ib_path = self.root.join(format!("{name}.ib"));
        if ib_path.exists() {
            let ib = self.read(format!("{name}.ib"))?;
            let indices = decode_index_buffer(&ib, layout.index_format).map_err(|source| {
                ProviderError::Buffer {
                    name: name.to_string(),
                    source,
                }
            })?;
            mesh = mesh.with_indices(indices);
        }

        Ok(mesh)
    }
}

/// Raw captured buffers for one component of an extracted object.
#[derive(Debug, Clone)]
pub struct ComponentBuffers {
    pub layout: VertexLayout,
    pub vertex_data: Vec<u8>,
    pub index_data: Option<Vec<u8>>,
}

/// A LOD object captured in memory rather than exported to disk.
///
/// Components take composite names (`{object_id} - Component {i}`) so that
/// several extracted objects can merge into one LOD table without collisions.
#[derive(Debug, Clone)]
pub struct ExtractedObject {
    pub object_id: String,
    pub metadata_json: String,
    pub buffers: Vec<ComponentBuffers>,
}

impl ExtractedObject {
    pub fn new(
        object_id: impl Into<String>,
        metadata_json: impl Into<String>,
        buffers: Vec<ComponentBuffers>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            metadata_json: metadata_json.into(),
            buffers,
        }
    }

    /// Map a composite component name back to its buffer slot.
    fn component_index(&self, name: &str) -> Option<usize> {
        let prefix = component_name_for(&self.object_id, 0);
        let prefix = prefix.strip_suffix('0')?;
        name.strip_prefix(prefix)?.parse().ok()
    }
}

impl ModelProvider for ExtractedObject {
    fn components(&self) -> Result<ComponentTable, ProviderError> {
        Ok(ModelDescriptor::from_json(&self.metadata_json)?
            .component_table_for(&self.object_id))
    }

    fn load_mesh(&self, name: &str) -> Result<Mesh, ProviderError> {
        let index = self
            .component_index(name)
            .filter(|&i| i < self.buffers.len())
            .ok_or_else(|| ProviderError::UnknownComponent {
                name: name.to_string(),
            })?;
        let buffers = &self.buffers[index];

        let mut mesh =
            decode_vertex_buffer(&buffers.vertex_data, &buffers.layout).map_err(|source| {
                ProviderError::Buffer {
                    name: name.to_string(),
                    source,
                }
            })?;
        if let Some(index_data) = &buffers.index_data {
            let indices = decode_index_buffer(index_data, buffers.layout.index_format).map_err(
                |source| ProviderError::Buffer {
                    name: name.to_string(),
                    source,
                },
            )?;
            mesh = mesh.with_indices(indices);
        }
        Ok(mesh)
    }
}
