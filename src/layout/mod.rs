pub mod governor;
pub mod squarify;

use std::collections::HashSet;

use compact_str::CompactString;
use serde::Deserialize;

use crate::fit::{self, ProfileKind, RenderProfile};
use crate::tiles::Tile;

pub use self::governor::{
    ConstraintGovernor, ConstraintPolicy, StripDecision, DEFAULT_MIN_THICKNESS_FACTOR,
};
pub use self::squarify::{partition, Partition, Placement, StripReport};

/// Axis-aligned rectangle, either in surface pixels or normalized to [0,1]².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Region {
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Express this pixel rect relative to a `width` x `height` container.
    pub fn normalized(&self, width: f64, height: f64) -> Region {
        Region {
            x: self.x / width,
            y: self.y / height,
            w: self.w / width,
            h: self.h / height,
        }
    }

    /// Area shared with `other` (0 when they only touch).
    pub fn intersection_area(&self, other: &Region) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }
}

/// How a strip sits in the free region.
///
/// A `Row` strip is a band spanning the full height of the free region at its
/// left edge: members are stacked top to bottom and its thickness consumes
/// width. A `Column` strip spans the full width at the top: members run left
/// to right and its thickness consumes height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripOrientation {
    Row,
    Column,
}

impl StripOrientation {
    pub fn flipped(self) -> Self {
        match self {
            Self::Row => Self::Column,
            Self::Column => Self::Row,
        }
    }

    /// Length of a strip along which members are laid.
    pub fn length(self, free: &Region) -> f64 {
        match self {
            Self::Row => free.h,
            Self::Column => free.w,
        }
    }

    /// Room available for the strip's thickness.
    pub fn extent(self, free: &Region) -> f64 {
        match self {
            Self::Row => free.w,
            Self::Column => free.h,
        }
    }
}

/// Base-orientation heuristic for each new strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationPolicy {
    /// Row when the free region is at least as wide as tall
    #[default]
    RowIfWide,
    /// Column whenever the free region is shorter than it is wide
    ColumnIfShort,
}

impl OrientationPolicy {
    pub fn base(self, width: f64, height: f64) -> StripOrientation {
        match self {
            Self::RowIfWide if width >= height => StripOrientation::Row,
            Self::RowIfWide => StripOrientation::Column,
            Self::ColumnIfShort if height < width => StripOrientation::Column,
            Self::ColumnIfShort => StripOrientation::Row,
        }
    }
}

/// Caller-supplied layout options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Which strips the governor protects
    pub policy: ConstraintPolicy,
    /// Symbols protected under `PriorityOnly` (and always shown with text)
    pub priority_set: HashSet<CompactString>,
    /// Symbol forced into a full-width strip at the top
    pub pinned_top_symbol: Option<CompactString>,
    /// Share of the baseline content box a protected strip must keep, in (0, 1]
    pub min_thickness_factor: f64,
    /// Base-orientation heuristic
    pub orientation: OrientationPolicy,
    /// Content style used for thresholds, scale and visibility
    pub profile: ProfileKind,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            policy: ConstraintPolicy::PriorityOnly,
            priority_set: HashSet::new(),
            pinned_top_symbol: None,
            min_thickness_factor: DEFAULT_MIN_THICKNESS_FACTOR,
            orientation: OrientationPolicy::RowIfWide,
            profile: ProfileKind::LogoAndText,
        }
    }
}

impl LayoutOptions {
    pub fn with_policy(mut self, policy: ConstraintPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_priority<'a>(mut self, symbols: impl IntoIterator<Item = &'a str>) -> Self {
        self.priority_set
            .extend(symbols.into_iter().map(CompactString::new));
        self
    }

    pub fn with_pinned_top(mut self, symbol: &str) -> Self {
        self.pinned_top_symbol = Some(CompactString::new(symbol));
        self
    }

    pub fn with_min_thickness_factor(mut self, factor: f64) -> Self {
        self.min_thickness_factor = factor;
        self
    }

    pub fn with_orientation(mut self, orientation: OrientationPolicy) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_profile(mut self, profile: ProfileKind) -> Self {
        self.profile = profile;
        self
    }

    pub fn is_priority(&self, symbol: &str) -> bool {
        self.priority_set.contains(symbol)
    }
}

/// Final per-tile layout: where it goes and how its content is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlacement {
    /// Index into the input tile slice
    pub index: usize,
    pub symbol: CompactString,
    /// Normalized rect
    pub rect: Region,
    /// Rect in surface pixels
    pub pixels: Region,
    pub scale: f64,
    pub show_text: bool,
    pub show_logo: bool,
}

/// Partition `tiles` with the governor configured from `options`/`profile`.
pub fn partition_tiles(
    tiles: &[Tile],
    width: f64,
    height: f64,
    options: &LayoutOptions,
    profile: &RenderProfile,
) -> Partition {
    let governor = ConstraintGovernor::new(
        options.policy,
        &options.priority_set,
        profile,
        options.min_thickness_factor,
    );
    partition(
        tiles,
        width,
        height,
        options.pinned_top_symbol.as_deref(),
        options.orientation,
        &governor,
    )
}

/// Pure layout entry point: rects plus content fit, using the built-in
/// baseline for `options.profile`. No presentation side effects.
pub fn compute_layout(
    tiles: &[Tile],
    width: f64,
    height: f64,
    options: &LayoutOptions,
) -> Vec<TilePlacement> {
    let profile = RenderProfile::fallback(options.profile);
    compute_layout_with_profile(tiles, width, height, options, &profile)
}

/// Like [`compute_layout`], with an explicitly measured profile.
pub fn compute_layout_with_profile(
    tiles: &[Tile],
    width: f64,
    height: f64,
    options: &LayoutOptions,
    profile: &RenderProfile,
) -> Vec<TilePlacement> {
    let partition = partition_tiles(tiles, width, height, options, profile);

    partition
        .placements
        .iter()
        .map(|placement| {
            let tile = &tiles[placement.index];
            let scale = fit::derive_scale(&placement.pixels, placement.rect.area(), profile);
            let visibility = fit::decide_visibility(
                &placement.pixels,
                tile,
                scale,
                options.is_priority(&tile.symbol),
                profile.kind,
            );
            TilePlacement {
                index: placement.index,
                symbol: tile.symbol.clone(),
                rect: placement.rect,
                pixels: placement.pixels,
                scale,
                show_text: visibility.show_text,
                show_logo: visibility.show_logo,
            }
        })
        .collect()
}
