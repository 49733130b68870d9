//! GPU rendering subsystem.
//!
//! Everything needed to put the background on screen:
//! - [`shader`]: GLSL stage loading, compilation and linking
//! - [`texture`]: PNG decoding, mip chain generation and upload
//! - [`geometry`]: the full-screen quad and its vertex layouts
//! - [`background`]: the renderer that owns the GPU objects and draws them
//!
//! Convention: quad positions are already in NDC, so no viewport uniform is
//! needed; the render pass viewport maps them onto the framebuffer.

mod ctx;

pub mod background;
pub mod geometry;
pub mod shader;
pub mod texture;

pub use background::{Background, BackgroundRenderer};
pub use ctx::{RenderCtx, RenderTarget};
