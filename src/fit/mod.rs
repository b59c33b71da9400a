pub mod profile;

pub use self::profile::{
    measure_baseline, ContentBox, ContentSizer, ProfileCache, ProfileKind, RenderProfile,
};

use crate::layout::Region;
use crate::tiles::Tile;

/// Lower/upper bounds of the area heuristic.
pub const MIN_SCALE: f64 = 0.32;
pub const MAX_SCALE: f64 = 3.0;

const SCALE_BASE: f64 = 0.6;
const SCALE_AREA_GAIN: f64 = 2.4;

// Non-priority text needs a readable box and scale.
const TEXT_MIN_WIDTH_PX: f64 = 44.0;
const TEXT_MIN_HEIGHT_PX: f64 = 24.0;
const TEXT_MIN_SCALE: f64 = 0.55;

const LOGO_MIN_SIDE_PX: f64 = 18.0;
const LOGO_WITH_TEXT_MIN_SCALE: f64 = 0.4;

/// Which parts of a tile's content are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub show_text: bool,
    pub show_logo: bool,
}

/// Content scale for a tile.
///
/// `pixels` is the tile's rect on the surface and `normalized_area` its share
/// of the container (0..=1). The area heuristic is clamped to
/// [`MIN_SCALE`]..=[`MAX_SCALE`], then tightened so the scaled baseline box
/// never overflows the rect (which may push it below `MIN_SCALE`).
pub fn derive_scale(pixels: &Region, normalized_area: f64, profile: &RenderProfile) -> f64 {
    let area = if normalized_area.is_finite() {
        normalized_area.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let heuristic = (SCALE_BASE + SCALE_AREA_GAIN * area.sqrt()).clamp(MIN_SCALE, MAX_SCALE);

    let fit_w = pixels.w / profile.baseline_width_px;
    let fit_h = pixels.h / profile.baseline_height_px;
    let scale = heuristic.min(fit_w).min(fit_h);

    if scale.is_finite() {
        scale.max(0.0)
    } else {
        0.0
    }
}

/// Decide text/logo visibility from fixed pixel and scale thresholds.
pub fn decide_visibility(
    pixels: &Region,
    tile: &Tile,
    scale: f64,
    is_priority: bool,
    kind: ProfileKind,
) -> Visibility {
    let logo_available = tile.has_logo() && kind == ProfileKind::LogoAndText;

    let show_text = is_priority
        || (pixels.w >= TEXT_MIN_WIDTH_PX
            && pixels.h >= TEXT_MIN_HEIGHT_PX
            && scale >= TEXT_MIN_SCALE);

    let show_logo = if show_text {
        logo_available && scale >= LOGO_WITH_TEXT_MIN_SCALE
    } else {
        // Logo-only fallback for tiles too small for text
        logo_available && pixels.w >= LOGO_MIN_SIDE_PX && pixels.h >= LOGO_MIN_SIDE_PX
    };

    Visibility {
        show_text,
        show_logo,
    }
}
