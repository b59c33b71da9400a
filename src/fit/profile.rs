use std::collections::HashMap;

use serde::Deserialize;

/// Content style a tile is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    /// Logo above symbol and metric text
    #[default]
    LogoAndText,
    /// Symbol and metric text only
    TextOnly,
}

/// Minimal pixel footprint needed to render one tile's content unscaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProfile {
    pub kind: ProfileKind,
    pub baseline_width_px: f64,
    pub baseline_height_px: f64,
}

impl RenderProfile {
    /// Built-in baseline used when nothing could be measured.
    pub const fn fallback(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::LogoAndText => Self {
                kind,
                baseline_width_px: 72.0,
                baseline_height_px: 56.0,
            },
            ProfileKind::TextOnly => Self {
                kind,
                baseline_width_px: 64.0,
                baseline_height_px: 34.0,
            },
        }
    }
}

/// Measured content box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBox {
    pub width: f64,
    pub height: f64,
}

/// Presentation-side capability that measures unscaled tile content
/// (e.g. an offscreen probe element). The core only ever sees the two numbers.
pub trait ContentSizer {
    fn measure(&self, kind: ProfileKind) -> Option<ContentBox>;
}

/// Measure the baseline for `kind`, falling back to built-in constants when
/// no sizer is available or it reports an unusable box.
pub fn measure_baseline(kind: ProfileKind, sizer: Option<&dyn ContentSizer>) -> RenderProfile {
    let measured = sizer.and_then(|s| s.measure(kind)).filter(|b| {
        b.width.is_finite() && b.height.is_finite() && b.width > 0.0 && b.height > 0.0
    });

    match measured {
        Some(b) => RenderProfile {
            kind,
            baseline_width_px: b.width,
            baseline_height_px: b.height,
        },
        None => {
            tracing::debug!("No usable content measurement for {:?}, using defaults", kind);
            RenderProfile::fallback(kind)
        }
    }
}

/// Per-surface memo of measured profiles.
#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: HashMap<ProfileKind, RenderProfile>,
}

impl ProfileCache {
    /// Cached profile for `kind`, measuring it on first use.
    pub fn resolve(&mut self, kind: ProfileKind, sizer: Option<&dyn ContentSizer>) -> RenderProfile {
        *self
            .profiles
            .entry(kind)
            .or_insert_with(|| measure_baseline(kind, sizer))
    }

    /// Drop one cached profile so the next draw measures it again.
    pub fn invalidate(&mut self, kind: ProfileKind) -> bool {
        self.profiles.remove(&kind).is_some()
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }

    pub fn contains(&self, kind: ProfileKind) -> bool {
        self.profiles.contains_key(&kind)
    }
}
