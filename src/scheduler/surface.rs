use crate::fit::ContentSizer;
use crate::frame::FrameTile;

/// Opaque identity of a rendering surface (container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Current content box of a surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceBox {
    pub width: f64,
    pub height: f64,
}

impl SurfaceBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether either axis moved by more than `tolerance` px.
    pub fn differs(&self, other: &SurfaceBox, tolerance: f64) -> bool {
        (self.width - other.width).abs() > tolerance || (self.height - other.height).abs() > tolerance
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Events the presentation layer forwards once listeners are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Resize,
    OrientationChange,
    ViewportScroll,
}

/// Presentation-side handle for one surface.
///
/// Implementations must not call back into the scheduler from inside these
/// methods; `install_listeners` and `request_animation_frame` only arrange
/// for later calls to [`RenderScheduler::notify`] and
/// [`RenderScheduler::on_animation_frame`].
///
/// [`RenderScheduler::notify`]: super::RenderScheduler::notify
/// [`RenderScheduler::on_animation_frame`]: super::RenderScheduler::on_animation_frame
pub trait RenderSurface {
    fn id(&self) -> SurfaceId;

    /// Read the surface's current box.
    fn measure(&self) -> SurfaceBox;

    /// Wire resize / orientation / viewport events to the scheduler.
    /// Called once per surface.
    fn install_listeners(&self);

    /// Ask for one animation tick.
    fn request_animation_frame(&self);

    /// Content measurement capability, if the surface has one.
    fn content_sizer(&self) -> Option<&dyn ContentSizer> {
        None
    }

    /// Replace the surface's output with `frame`.
    fn present(&self, frame: &[FrameTile]);

    /// Remove any prior output.
    fn clear(&self);
}
