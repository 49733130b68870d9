use std::path::PathBuf;

use bg_gen_engine::window::RuntimeConfig;

/// Which background the binary draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Variant {
    /// Cleared viewport only.
    Clear,
    /// Flat-colored quad.
    Flat,
    /// Quad sampling `assets/bg1.png`.
    Textured,
}

/// Everything a run needs, fixed per variant. Paths are relative to the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundConfig {
    pub variant: Variant,
    pub window: RuntimeConfig,
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
    pub texture: Option<PathBuf>,
}

impl BackgroundConfig {
    pub fn for_variant(variant: Variant) -> Self {
        let (vertex_shader, fragment_shader, texture) = match variant {
            Variant::Clear => (None, None, None),
            Variant::Flat => (
                Some("shaders/flat/background.vertex.glsl"),
                Some("shaders/flat/background.fragment.glsl"),
                None,
            ),
            Variant::Textured => (
                Some("shaders/background.vertex.glsl"),
                Some("shaders/background.fragment.glsl"),
                Some("assets/bg1.png"),
            ),
        };

        Self {
            variant,
            window: RuntimeConfig::default(),
            vertex_shader: vertex_shader.map(PathBuf::from),
            fragment_shader: fragment_shader.map(PathBuf::from),
            texture: texture.map(PathBuf::from),
        }
    }
}
