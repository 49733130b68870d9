use winit::dpi::PhysicalSize;

/// Rendering viewport in physical framebuffer pixels.
///
/// The background always covers the whole framebuffer, so the origin stays at
/// `(0, 0)` and only the extent follows the window.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Full-framebuffer viewport of the given size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    #[inline]
    pub fn from_size(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }

    /// A zero-area viewport (minimized window) must not be drawn into.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamps the viewport to a render target of `size`.
    ///
    /// wgpu rejects viewports that extend past the attachment, which can happen
    /// for one frame between a resize event and the surface reconfigure.
    pub fn clamped_to(self, size: PhysicalSize<u32>) -> Self {
        let x = self.x.min(size.width);
        let y = self.y.min(size.height);
        Self {
            x,
            y,
            width: self.width.min(size.width - x),
            height: self.height.min(size.height - y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_anchored_at_origin() {
        let vp = Viewport::new(1152, 648);
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (0, 0, 1152, 648));
    }

    #[test]
    fn from_size_matches_framebuffer() {
        assert_eq!(Viewport::from_size(PhysicalSize::new(800, 600)), Viewport::new(800, 600));
    }

    #[test]
    fn zero_extent_is_empty() {
        assert!(Viewport::new(0, 648).is_empty());
        assert!(Viewport::new(1152, 0).is_empty());
        assert!(!Viewport::new(1, 1).is_empty());
    }

    #[test]
    fn clamped_to_shrinks_to_target() {
        let vp = Viewport::new(1920, 1080).clamped_to(PhysicalSize::new(1152, 648));
        assert_eq!(vp, Viewport::new(1152, 648));
    }

    #[test]
    fn clamped_to_keeps_smaller_viewport() {
        let vp = Viewport::new(640, 480).clamped_to(PhysicalSize::new(1152, 648));
        assert_eq!(vp, Viewport::new(640, 480));
    }
}
