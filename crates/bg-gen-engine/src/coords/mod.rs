//! Coordinate types shared by the runtime and the renderer.
//!
//! All values are physical framebuffer pixels with the origin at the
//! top-left corner of the surface.

mod viewport;

pub use viewport::Viewport;
