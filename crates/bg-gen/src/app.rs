use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use bg_gen_engine::coords::Viewport;
use bg_gen_engine::core::{App, AppControl, FrameCtx};
use bg_gen_engine::device::GpuInit;
use bg_gen_engine::render::shader::{load_program, LinkedProgram};
use bg_gen_engine::render::texture::decode_image;
use bg_gen_engine::render::BackgroundRenderer;
use bg_gen_engine::window::Runtime;

use crate::config::{BackgroundConfig, Variant};

/// Loads everything the variant needs from disk before a window exists.
///
/// Shaders are compiled and linked first, then the texture is decoded.
pub fn prepare(config: &BackgroundConfig) -> Result<BackgroundRenderer> {
    let renderer = match config.variant {
        Variant::Clear => BackgroundRenderer::clear(),
        Variant::Flat => BackgroundRenderer::flat(load_shaders(config)?)?,
        Variant::Textured => {
            let program = load_shaders(config)?;
            let path = config
                .texture
                .as_deref()
                .context("no texture configured")?;
            let image = decode_image(path).context("could not load texture")?;
            log::info!(
                "loaded {} ({}x{}, {} channels)",
                path.display(),
                image.width,
                image.height,
                image.channels
            );
            BackgroundRenderer::textured(program, image)?
        }
    };

    Ok(renderer)
}

fn load_shaders(config: &BackgroundConfig) -> Result<LinkedProgram> {
    let vertex = config
        .vertex_shader
        .as_deref()
        .context("no vertex shader configured")?;
    let fragment = config
        .fragment_shader
        .as_deref()
        .context("no fragment shader configured")?;
    Ok(load_program(vertex, fragment)?)
}

/// The window listener: tracks the viewport and draws the background.
pub struct BackgroundApp {
    viewport: Viewport,
    renderer: Option<BackgroundRenderer>,
}

impl BackgroundApp {
    pub fn new(initial_size: PhysicalSize<u32>, renderer: BackgroundRenderer) -> Self {
        Self {
            viewport: Viewport::from_size(initial_size),
            renderer: Some(renderer),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl App for BackgroundApp {
    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        self.viewport = Viewport::from_size(size);
        log::debug!("viewport {}x{}", size.width, size.height);
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if matches!(event, WindowEvent::CloseRequested) {
            // GPU objects go before the window and device.
            self.renderer = None;
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(AppControl::Exit);
        };
        ctx.render(self.viewport, wgpu::Color::BLACK, |rctx, target| {
            renderer.render(rctx, target)
        })
    }
}

/// Prepares the variant, then opens the window and runs until it is closed.
pub fn run(config: BackgroundConfig) -> Result<()> {
    let renderer = prepare(&config)?;
    let app = BackgroundApp::new(config.window.size(), renderer);
    Runtime::run(config.window, GpuInit::default(), app)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use bg_gen_engine::render::geometry::QuadLayout;

    /// The variant's config with its paths resolved against this crate.
    fn shipped(variant: Variant) -> BackgroundConfig {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let mut config = BackgroundConfig::for_variant(variant);
        for path in [
            &mut config.vertex_shader,
            &mut config.fragment_shader,
            &mut config.texture,
        ] {
            *path = path.as_deref().map(|p| root.join(p));
        }
        config
    }

    fn app() -> BackgroundApp {
        BackgroundApp::new(PhysicalSize::new(1152, 648), BackgroundRenderer::clear())
    }

    #[test]
    fn initial_viewport_covers_the_window() {
        assert_eq!(app().viewport(), Viewport::new(1152, 648));
    }

    #[test]
    fn resize_only_replaces_the_viewport() {
        let mut app = app();
        app.on_resize(PhysicalSize::new(800, 600));
        assert_eq!(app.viewport(), Viewport { x: 0, y: 0, width: 800, height: 600 });
        assert!(app.renderer.is_some());

        app.on_resize(PhysicalSize::new(800, 600));
        assert_eq!(app.viewport(), Viewport::new(800, 600));
    }

    #[test]
    fn minimize_records_zero_viewport() {
        let mut app = app();
        app.on_resize(PhysicalSize::new(0, 0));
        assert!(app.viewport().is_empty());
    }

    #[test]
    fn close_releases_the_renderer() {
        let mut app = app();
        assert_eq!(app.on_window_event(&WindowEvent::CloseRequested), AppControl::Continue);
        assert!(app.renderer.is_none());
    }

    #[test]
    fn clear_variant_prepares_without_files() {
        let renderer = prepare(&BackgroundConfig::for_variant(Variant::Clear)).unwrap();
        assert_eq!(renderer.layout(), None);
    }

    #[test]
    fn shipped_flat_shaders_fit_the_flat_pipeline() {
        let renderer = prepare(&shipped(Variant::Flat)).unwrap();
        assert_eq!(renderer.layout(), Some(QuadLayout::Flat));
    }

    #[test]
    fn shipped_textured_assets_fit_the_textured_pipeline() {
        let renderer = prepare(&shipped(Variant::Textured)).unwrap();
        assert_eq!(renderer.layout(), Some(QuadLayout::Textured));
    }

    #[test]
    fn shipped_background_image_matches_the_window() {
        let config = shipped(Variant::Textured);
        let image = decode_image(config.texture.as_deref().unwrap()).unwrap();
        assert_eq!((image.width, image.height), (1152, 648));
        assert_eq!(image.channels, 3);
        assert_eq!(image.mip_level_count(), 11);
    }
}
