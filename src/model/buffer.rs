use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::mesh::{Mesh, MAX_INFLUENCES};

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("vertex buffer length {len} is not a multiple of stride {stride}")]
    UnevenVertexBuffer { len: usize, stride: usize },

    #[error("vertex stride {stride} cannot hold `{attribute}` at offset {offset}")]
    AttributeOutOfStride {
        attribute: &'static str,
        offset: usize,
        stride: usize,
    },

    #[error("index buffer length {len} is not a multiple of {width}-byte indices")]
    UnevenIndexBuffer { len: usize, width: usize },
}

/// Width of one index in an index buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    U16,
    #[default]
    U32,
}

impl IndexFormat {
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Describes where attributes live inside an interleaved vertex buffer.
///
/// All values are byte offsets from the start of a vertex. Positions are
/// three little-endian f32s; blend indices are four u8s and blend weights
/// four little-endian f32s, both optional. Loaded from a `.fmt` sidecar when
/// present, otherwise the position-only default applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexLayout {
    pub stride: usize,
    pub position_offset: usize,
    pub blend_indices_offset: Option<usize>,
    pub blend_weights_offset: Option<usize>,
    pub index_format: IndexFormat,
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self {
            stride: 12,
            position_offset: 0,
            blend_indices_offset: None,
            blend_weights_offset: None,
            index_format: IndexFormat::U32,
        }
    }
}

impl VertexLayout {
    /// Layout for position + 4x u8 blend indices + 4x f32 blend weights.
    #[must_use]
    pub fn skinned() -> Self {
        Self {
            stride: 32,
            position_offset: 0,
            blend_indices_offset: Some(12),
            blend_weights_offset: Some(16),
            index_format: IndexFormat::U32,
        }
    }

    fn validate(&self) -> Result<(), BufferError> {
        let check = |attribute: &'static str, offset: usize, size: usize| {
            if offset + size > self.stride {
                Err(BufferError::AttributeOutOfStride {
                    attribute,
                    offset,
                    stride: self.stride,
                })
            } else {
                Ok(())
            }
        };

        check("position", self.position_offset, 12)?;
        if let Some(offset) = self.blend_indices_offset {
            check("blend_indices", offset, MAX_INFLUENCES)?;
        }
        if let Some(offset) = self.blend_weights_offset {
            check("blend_weights", offset, MAX_INFLUENCES * 4)?;
        }
        Ok(())
    }
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    // Callers bounds-check via VertexLayout::validate plus the stride loop.
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(raw)
}

/// Decode an interleaved vertex buffer into a [`Mesh`] (without indices).
///
/// # Errors
///
/// Returns `BufferError::UnevenVertexBuffer` if the byte length does not
/// divide by the stride, or `AttributeOutOfStride` for a layout whose
/// attributes overrun the stride.
pub fn decode_vertex_buffer(bytes: &[u8], layout: &VertexLayout) -> Result<Mesh, BufferError> {
    layout.validate()?;
    if bytes.len() % layout.stride != 0 {
        return Err(BufferError::UnevenVertexBuffer {
            len: bytes.len(),
            stride: layout.stride,
        });
    }

    let vertex_count = bytes.len() / layout.stride;
    let mut positions = Vec::with_capacity(vertex_count);
    let skinned = layout.blend_indices_offset.is_some() && layout.blend_weights_offset.is_some();
    let mut group_indices = Vec::with_capacity(if skinned { vertex_count } else { 0 });
    let mut group_weights = Vec::with_capacity(if skinned { vertex_count } else { 0 });

    for vertex in bytes.chunks_exact(layout.stride) {
        let p = layout.position_offset;
        positions.push(Vec3::new(
            read_f32(vertex, p),
            read_f32(vertex, p + 4),
            read_f32(vertex, p + 8),
        ));

        if let (Some(idx_offset), Some(w_offset)) =
            (layout.blend_indices_offset, layout.blend_weights_offset)
        {
            let mut indices = [0u32; MAX_INFLUENCES];
            let mut weights = [0f32; MAX_INFLUENCES];
            for slot in 0..MAX_INFLUENCES {
                indices[slot] = u32::from(vertex[idx_offset + slot]);
                weights[slot] = read_f32(vertex, w_offset + slot * 4);
            }
            group_indices.push(indices);
            group_weights.push(weights);
        }
    }

    let mesh = Mesh::new(positions);
    Ok(if skinned {
        mesh.with_skinning(group_indices, group_weights)
    } else {
        mesh
    })
}

/// Decode a little-endian index buffer.
///
/// # Errors
///
/// Returns `BufferError::UnevenIndexBuffer` if the byte length does not
/// divide by the index width.
pub fn decode_index_buffer(bytes: &[u8], format: IndexFormat) -> Result<Vec<u32>, BufferError> {
    let width = format.width();
    if bytes.len() % width != 0 {
        return Err(BufferError::UnevenIndexBuffer {
            len: bytes.len(),
            width,
        });
    }

    let indices = match format {
        IndexFormat::U16 => bytes
            .chunks_exact(2)
            .map(|raw| u32::from(u16::from_le_bytes([raw[0], raw[1]])))
            .collect(),
        IndexFormat::U32 => bytes
            .chunks_exact(4)
            .map(|raw| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect(),
    };
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_bytes(positions: &[[f32; 3]]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for p in positions {
            for v in p {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_decode_position_only() {
        let bytes = position_bytes(&[[1.0, 2.0, 3.0], [-4.0, 0.5, 0.0]]);
        let mesh = decode_vertex_buffer(&bytes, &VertexLayout::default()).unwrap();

        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.positions[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.positions[1], Vec3::new(-4.0, 0.5, 0.0));
        assert!(!mesh.has_skinning());
    }

    #[test]
    fn test_decode_skinned() {
        let mut bytes = Vec::new();
        // One vertex: position, 4x u8 indices, 4x f32 weights
        for v in [1.0f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[2, 5, 0, 0]);
        for w in [0.75f32, 0.25, 0.0, 0.0] {
            bytes.extend_from_slice(&w.to_le_bytes());
        }

        let mesh = decode_vertex_buffer(&bytes, &VertexLayout::skinned()).unwrap();
        assert_eq!(mesh.vertex_count(), 1);
        assert!(mesh.has_skinning());
        assert_eq!(mesh.group_indices[0], [2, 5, 0, 0]);
        assert_eq!(mesh.group_weights[0], [0.75, 0.25, 0.0, 0.0]);
        assert_eq!(mesh.group_count(), 6);
    }

    #[test]
    fn test_decode_uneven_buffer() {
        let bytes = vec![0u8; 13];
        assert!(matches!(
            decode_vertex_buffer(&bytes, &VertexLayout::default()),
            Err(BufferError::UnevenVertexBuffer { len: 13, stride: 12 })
        ));
    }

    #[test]
    fn test_layout_out_of_stride() {
        let layout = VertexLayout {
            stride: 16,
            position_offset: 0,
            blend_indices_offset: Some(12),
            blend_weights_offset: Some(16),
            index_format: IndexFormat::U32,
        };
        assert!(matches!(
            decode_vertex_buffer(&[], &layout),
            Err(BufferError::AttributeOutOfStride {
                attribute: "blend_weights",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_index_buffer_u16() {
        let bytes: Vec<u8> = [0u16, 1, 2, 2, 1, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        let indices = decode_index_buffer(&bytes, IndexFormat::U16).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_decode_index_buffer_u32() {
        let bytes: Vec<u8> = [7u32, 70_000]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        let indices = decode_index_buffer(&bytes, IndexFormat::U32).unwrap();
        assert_eq!(indices, vec![7, 70_000]);
    }

    #[test]
    fn test_decode_index_buffer_uneven() {
        assert!(decode_index_buffer(&[0u8; 3], IndexFormat::U16).is_err());
    }

    #[test]
    fn test_layout_sidecar_roundtrip() {
        let json = r#"{"stride": 32, "blend_indices_offset": 12, "blend_weights_offset": 16}"#;
        let layout: VertexLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout, VertexLayout::skinned());
    }
}
