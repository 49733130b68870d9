/// Initialization parameters for the GPU layer.
///
/// The background only needs what an OpenGL 3.3 core context offers, so the
/// defaults ask for downlevel limits and no optional features. Any adapter that
/// can run the GL backend qualifies.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends wgpu may pick an adapter from.
    pub backends: wgpu::Backends,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is the buffer-swap-on-vblank behavior every platform supports.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// Resolution-dependent limits (texture dimensions) are raised to what the
    /// adapter supports at device creation.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}
