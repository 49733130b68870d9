//! The full-screen quad: 4 vertices, 6 indices, two triangles.
//!
//! Positions are NDC corners. The textured layout interleaves a texture
//! coordinate after each position; wgpu samples with `v = 0` at the top row
//! of the image, so the top edge of the quad maps to `v = 0`.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Triangles `(0, 1, 3)` and `(1, 2, 3)`.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PositionVertex {
    pub pos: [f32; 2],
}

impl PositionVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];
}

pub const FLAT_QUAD: [PositionVertex; 4] = [
    PositionVertex { pos: [1.0, 1.0] },
    PositionVertex { pos: [1.0, -1.0] },
    PositionVertex { pos: [-1.0, -1.0] },
    PositionVertex { pos: [-1.0, 1.0] },
];

pub const TEXTURED_QUAD: [TexturedVertex; 4] = [
    TexturedVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
    TexturedVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    TexturedVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    TexturedVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Vertex layout of the quad, one per drawing variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QuadLayout {
    /// Position only, stride 2 floats.
    Flat,
    /// Position + texture coordinate, stride 4 floats.
    Textured,
}

impl QuadLayout {
    pub fn vertex_count(self) -> usize {
        match self {
            QuadLayout::Flat => FLAT_QUAD.len(),
            QuadLayout::Textured => TEXTURED_QUAD.len(),
        }
    }

    pub fn attributes(self) -> &'static [wgpu::VertexAttribute] {
        match self {
            QuadLayout::Flat => &PositionVertex::ATTRS,
            QuadLayout::Textured => &TexturedVertex::ATTRS,
        }
    }

    pub fn array_stride(self) -> wgpu::BufferAddress {
        let size = match self {
            QuadLayout::Flat => std::mem::size_of::<PositionVertex>(),
            QuadLayout::Textured => std::mem::size_of::<TexturedVertex>(),
        };
        size as wgpu::BufferAddress
    }

    pub fn vertex_buffer_layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes(),
        }
    }

    fn vertex_bytes(self) -> &'static [u8] {
        match self {
            QuadLayout::Flat => bytemuck::cast_slice(&FLAT_QUAD),
            QuadLayout::Textured => bytemuck::cast_slice(&TEXTURED_QUAD),
        }
    }
}

/// Immutable GPU copies of the quad.
pub struct QuadBuffers {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

impl QuadBuffers {
    /// Uploads the quad once; the buffers are never written again.
    pub fn upload(device: &wgpu::Device, layout: QuadLayout) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bg-gen quad vbo"),
            contents: layout.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bg-gen quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertices,
            indices,
            index_count: QUAD_INDICES.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUTS: [QuadLayout; 2] = [QuadLayout::Flat, QuadLayout::Textured];

    #[test]
    fn quad_is_four_vertices_and_six_indices() {
        for layout in LAYOUTS {
            assert_eq!(layout.vertex_count(), 4, "{layout:?}");
        }
        assert_eq!(QUAD_INDICES.len(), 6);
    }

    #[test]
    fn indices_describe_two_triangles() {
        let triangles: Vec<&[u32]> = QUAD_INDICES.chunks(3).collect();
        assert_eq!(triangles, vec![&[0u32, 1, 3][..], &[1u32, 2, 3][..]]);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < FLAT_QUAD.len()));
    }

    #[test]
    fn both_layouts_share_positions() {
        for (flat, textured) in FLAT_QUAD.iter().zip(TEXTURED_QUAD.iter()) {
            assert_eq!(flat.pos, textured.pos);
        }
    }

    #[test]
    fn quad_covers_clip_space() {
        let xs: Vec<f32> = FLAT_QUAD.iter().map(|v| v.pos[0]).collect();
        let ys: Vec<f32> = FLAT_QUAD.iter().map(|v| v.pos[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn flat_layout_is_one_position_at_stride_two_floats() {
        let layout = QuadLayout::Flat;
        assert_eq!(layout.array_stride(), 8);
        let attrs = layout.attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].shader_location, 0);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[0].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn textured_layout_interleaves_uv_after_position() {
        let layout = QuadLayout::Textured;
        assert_eq!(layout.array_stride(), 16);
        let attrs = layout.attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!((attrs[0].shader_location, attrs[0].offset), (0, 0));
        assert_eq!((attrs[1].shader_location, attrs[1].offset), (1, 8));
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn uv_corners_follow_position_corners() {
        for v in TEXTURED_QUAD {
            let expected_u = if v.pos[0] > 0.0 { 1.0 } else { 0.0 };
            let expected_v = if v.pos[1] > 0.0 { 0.0 } else { 1.0 };
            assert_eq!(v.uv, [expected_u, expected_v], "vertex {v:?}");
        }
    }

    #[test]
    fn vertex_bytes_match_stride() {
        for layout in LAYOUTS {
            let bytes = layout.vertex_bytes();
            assert_eq!(bytes.len() as u64, layout.array_stride() * layout.vertex_count() as u64);
        }
    }
}
