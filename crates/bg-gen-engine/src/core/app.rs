use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Window-event listener implemented by the application object.
///
/// The runtime owns the window and the GPU context and forwards events here;
/// the application never registers global callbacks.
pub trait App {
    /// Called after the runtime reconfigured the surface for a new framebuffer
    /// size. `size` may be zero while the window is minimized.
    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        let _ = size;
    }

    /// Called for every window event, before the runtime's own handling.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw.
    ///
    /// An error stops the event loop and is returned from `Runtime::run`.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;
}
