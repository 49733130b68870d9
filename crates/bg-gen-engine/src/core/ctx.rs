use anyhow::{bail, Result};
use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{RenderCtx, RenderTarget};

use super::app::AppControl;

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Clears the surface with `clear`, calls `draw` with a ready [`RenderCtx`]
    /// and [`RenderTarget`], then presents the frame.
    ///
    /// Frames are skipped while the surface has no area (minimized window) or
    /// after a recoverable surface error. Running out of memory is fatal.
    pub fn render<F>(&mut self, viewport: Viewport, clear: wgpu::Color, draw: F) -> Result<AppControl>
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>) -> Result<()>,
    {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(AppControl::Continue);
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                log::debug!("surface error: {err}");
                match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => bail!("surface ran out of memory"),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        return Ok(AppControl::Continue);
                    }
                }
            }
        };

        // Clear pass; dropped before the encoder is moved into submit().
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bg-gen clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            viewport.clamped_to(size),
        );

        // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
        let drawn = {
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            draw(&rctx, &mut target)
        };

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        drawn.map(|()| AppControl::Continue)
    }
}
