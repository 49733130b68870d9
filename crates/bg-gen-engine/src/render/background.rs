//! Full-screen background renderer.
//!
//! Built from CPU-side data ([`Background`]) before a window exists; GPU
//! objects are created lazily on the first frame and owned until drop.

use anyhow::{Context, Result};

use crate::render::geometry::{QuadBuffers, QuadLayout};
use crate::render::shader::{LinkedProgram, ResourceKind, ResourceSlot, ShaderError};
use crate::render::texture::{BackgroundTexture, DecodedImage};
use crate::render::{RenderCtx, RenderTarget};

/// Bindings the textured pipeline provides to its fragment stage.
pub const TEXTURED_BINDINGS: [ResourceSlot; 2] = [
    ResourceSlot {
        group: 0,
        binding: 0,
        kind: ResourceKind::Texture,
    },
    ResourceSlot {
        group: 0,
        binding: 1,
        kind: ResourceKind::Sampler,
    },
];

/// What to draw behind everything else.
#[derive(Debug)]
pub enum Background {
    /// Nothing; the frame clear is the background.
    Clear,
    /// The quad shaded by `program`.
    Flat { program: LinkedProgram },
    /// The quad with `image` sampled by `program`.
    Textured {
        program: LinkedProgram,
        image: DecodedImage,
    },
}

impl Background {
    /// Vertex layout the quad is uploaded with, `None` when nothing is drawn.
    pub fn layout(&self) -> Option<QuadLayout> {
        match self {
            Background::Clear => None,
            Background::Flat { .. } => Some(QuadLayout::Flat),
            Background::Textured { .. } => Some(QuadLayout::Textured),
        }
    }
}

/// Owns every GPU object of the background.
///
/// Dropping the renderer releases the pipeline, texture, sampler and buffers.
pub struct BackgroundRenderer {
    layout: Option<QuadLayout>,
    program: Option<LinkedProgram>,
    // Moved into the GPU texture on first frame.
    pending_image: Option<DecodedImage>,

    // pipeline
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    // bindings
    bind_group: Option<wgpu::BindGroup>,
    texture: Option<BackgroundTexture>,

    // geometry
    quad: Option<QuadBuffers>,
}

impl BackgroundRenderer {
    /// Checks the program of `background` against the pipeline it will run in.
    pub fn new(background: Background) -> Result<Self, ShaderError> {
        let layout = background.layout();
        let (program, pending_image) = match background {
            Background::Clear => (None, None),
            Background::Flat { program } => {
                program.check_pipeline(QuadLayout::Flat.attributes(), &[])?;
                (Some(program), None)
            }
            Background::Textured { program, image } => {
                program.check_pipeline(QuadLayout::Textured.attributes(), &TEXTURED_BINDINGS)?;
                (Some(program), Some(image))
            }
        };

        Ok(Self {
            layout,
            program,
            pending_image,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            texture: None,
            quad: None,
        })
    }

    pub fn clear() -> Self {
        Self {
            layout: None,
            program: None,
            pending_image: None,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            texture: None,
            quad: None,
        }
    }

    pub fn flat(program: LinkedProgram) -> Result<Self, ShaderError> {
        Self::new(Background::Flat { program })
    }

    pub fn textured(program: LinkedProgram, image: DecodedImage) -> Result<Self, ShaderError> {
        Self::new(Background::Textured { program, image })
    }

    pub fn layout(&self) -> Option<QuadLayout> {
        self.layout
    }

    fn is_textured(&self) -> bool {
        self.layout == Some(QuadLayout::Textured)
    }

    /// Draws the quad over the already cleared target.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<()> {
        if self.layout.is_none() || ctx.viewport.is_empty() {
            return Ok(());
        }

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_texture(ctx)?;
        self.ensure_bindings(ctx);

        let pipeline = self.pipeline.as_ref().context("background pipeline missing")?;
        let quad = self.quad.as_ref().context("background quad missing")?;

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("bg-gen background pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let vp = ctx.viewport;
        rpass.set_viewport(
            vp.x as f32,
            vp.y as f32,
            vp.width as f32,
            vp.height as f32,
            0.0,
            1.0,
        );
        rpass.set_pipeline(pipeline);
        if self.is_textured() {
            let bind_group = self.bind_group.as_ref().context("background bind group missing")?;
            rpass.set_bind_group(0, bind_group, &[]);
        }
        rpass.set_vertex_buffer(0, quad.vertices.slice(..));
        rpass.set_index_buffer(quad.indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..quad.index_count, 0, 0..1);

        Ok(())
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }
        let (Some(program), Some(layout)) = (self.program.as_ref(), self.layout) else {
            return;
        };

        let (vs, fs) = program.create_modules(ctx.device);

        let bgl = self.is_textured().then(|| {
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("bg-gen background bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = bgl.iter().collect();
        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bg-gen background pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("bg-gen background pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some(program.vertex().entry_point()),
                compilation_options: Default::default(),
                buffers: &[layout.vertex_buffer_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some(program.fragment().entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("background pipeline built for {:?} ({layout:?})", ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = bgl;
        self.bind_group = None;
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad.is_some() {
            return;
        }
        let Some(layout) = self.layout else {
            return;
        };
        self.quad = Some(QuadBuffers::upload(ctx.device, layout));
    }

    fn ensure_texture(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        let Some(image) = self.pending_image.take() else {
            return Ok(());
        };
        let texture = BackgroundTexture::upload(
            ctx.device,
            ctx.queue,
            image,
            ctx.surface_format.is_srgb(),
        )
        .context("uploading background texture")?;
        self.texture = Some(texture);
        self.bind_group = None;
        Ok(())
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else {
            return;
        };
        let Some(texture) = self.texture.as_ref() else {
            return;
        };

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg-gen background bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use crate::render::shader::{compile, link, ShaderStage};
    use crate::render::texture::decode_bytes;

    const FLAT_VERTEX: &str = "#version 450
layout(location = 0) in vec2 a_position;
void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

    const FLAT_FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 o_color;
void main() {
    o_color = vec4(0.2, 0.3, 0.3, 1.0);
}
";

    const TEXTURED_VERTEX: &str = "#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;
void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

    const TEXTURED_FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;
layout(set = 0, binding = 0) uniform texture2D u_background;
layout(set = 0, binding = 1) uniform sampler u_sampler;
void main() {
    o_color = texture(sampler2D(u_background, u_sampler), v_uv);
}
";

    fn program(vertex: &str, fragment: &str) -> LinkedProgram {
        link(
            compile(ShaderStage::Vertex, vertex).unwrap(),
            compile(ShaderStage::Fragment, fragment).unwrap(),
        )
        .unwrap()
    }

    fn tiny_image() -> DecodedImage {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        decode_bytes(Path::new("tiny.png"), bytes.get_ref()).unwrap()
    }

    #[test]
    fn clear_draws_nothing() {
        assert_eq!(BackgroundRenderer::clear().layout(), None);
        assert_eq!(BackgroundRenderer::new(Background::Clear).unwrap().layout(), None);
    }

    #[test]
    fn flat_program_fits_flat_pipeline() {
        let renderer = BackgroundRenderer::flat(program(FLAT_VERTEX, FLAT_FRAGMENT)).unwrap();
        assert_eq!(renderer.layout(), Some(QuadLayout::Flat));
    }

    #[test]
    fn textured_program_fits_textured_pipeline() {
        let renderer = BackgroundRenderer::textured(
            program(TEXTURED_VERTEX, TEXTURED_FRAGMENT),
            tiny_image(),
        )
        .unwrap();
        assert_eq!(renderer.layout(), Some(QuadLayout::Textured));
        assert!(renderer.pending_image.is_some());
    }

    #[test]
    fn textured_program_is_rejected_by_flat_pipeline() {
        let Err(err) = BackgroundRenderer::flat(program(TEXTURED_VERTEX, TEXTURED_FRAGMENT)) else {
            panic!("expected link error");
        };
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn flat_program_runs_in_textured_pipeline() {
        // Unused attributes and bindings are allowed.
        let renderer =
            BackgroundRenderer::textured(program(FLAT_VERTEX, FLAT_FRAGMENT), tiny_image()).unwrap();
        assert!(renderer.is_textured());
    }
}
