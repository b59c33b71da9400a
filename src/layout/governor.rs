use std::collections::HashSet;

use compact_str::CompactString;
use serde::Deserialize;

use super::{Region, StripOrientation};
use crate::fit::RenderProfile;
use crate::tiles::Tile;

/// Default share of the baseline content box a strip must keep.
pub const DEFAULT_MIN_THICKNESS_FACTOR: f64 = 0.75;

/// Which strips are protected against sub-threshold thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintPolicy {
    /// Only strips holding at least one priority tile
    #[default]
    PriorityOnly,
    /// Every strip
    ConstrainAll,
}

/// Outcome of reviewing one candidate strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripDecision {
    /// Orientation to commit with
    pub orientation: StripOrientation,
    pub qualified: bool,
    pub flipped: bool,
    /// Minor-axis thickness under `orientation` (px)
    pub thickness: f64,
    /// Minimum thickness for `orientation` (px)
    pub threshold: f64,
    /// False only for a qualifying strip still below threshold after the flip
    pub satisfied: bool,
}

/// Decides, per strip, whether to flip orientation so protected tiles keep
/// room for their content.
#[derive(Debug, Clone)]
pub struct ConstraintGovernor<'a> {
    policy: ConstraintPolicy,
    priority: &'a HashSet<CompactString>,
    min_width_px: f64,
    min_height_px: f64,
}

impl<'a> ConstraintGovernor<'a> {
    pub fn new(
        policy: ConstraintPolicy,
        priority: &'a HashSet<CompactString>,
        profile: &RenderProfile,
        min_thickness_factor: f64,
    ) -> Self {
        let factor = normalize_factor(min_thickness_factor);
        Self {
            policy,
            priority,
            min_width_px: profile.baseline_width_px * factor,
            min_height_px: profile.baseline_height_px * factor,
        }
    }

    /// Whether a strip with these members is subject to the constraint.
    pub fn qualifies(&self, members: &[&Tile]) -> bool {
        match self.policy {
            ConstraintPolicy::ConstrainAll => true,
            ConstraintPolicy::PriorityOnly => members
                .iter()
                .any(|tile| self.priority.contains(tile.symbol.as_str())),
        }
    }

    /// Minimum minor-axis thickness for a strip committed in `orientation`.
    /// A row band must fit the content width, a column band its height.
    pub fn threshold(&self, orientation: StripOrientation) -> f64 {
        match orientation {
            StripOrientation::Row => self.min_width_px,
            StripOrientation::Column => self.min_height_px,
        }
    }

    /// Review a closed strip. At most one flip is attempted; a strip still
    /// below threshold afterwards is committed as is. The last strip is
    /// judged at the full extent it will be committed with.
    pub fn review(
        &self,
        members: &[&Tile],
        strip_area: f64,
        free: &Region,
        base: StripOrientation,
        is_last: bool,
    ) -> StripDecision {
        let measure = |orientation: StripOrientation| {
            if is_last {
                orientation.extent(free)
            } else {
                strip_thickness(strip_area, free, orientation)
            }
        };
        let thickness = measure(base);
        let threshold = self.threshold(base);

        if !self.qualifies(members) {
            return StripDecision {
                orientation: base,
                qualified: false,
                flipped: false,
                thickness,
                threshold,
                satisfied: true,
            };
        }

        if thickness >= threshold {
            return StripDecision {
                orientation: base,
                qualified: true,
                flipped: false,
                thickness,
                threshold,
                satisfied: true,
            };
        }

        let flipped = base.flipped();
        let flipped_thickness = measure(flipped);
        let flipped_threshold = self.threshold(flipped);
        let satisfied = flipped_thickness >= flipped_threshold;

        tracing::trace!(
            "Strip of {} flipped {:?} -> {:?}: thickness {:.1} -> {:.1}px",
            members.len(),
            base,
            flipped,
            thickness,
            flipped_thickness
        );
        if !satisfied {
            tracing::debug!(
                "Strip of {} stays below threshold after flip ({:.1} < {:.1}px), committing anyway",
                members.len(),
                flipped_thickness,
                flipped_threshold
            );
        }

        StripDecision {
            orientation: flipped,
            qualified: true,
            flipped: true,
            thickness: flipped_thickness,
            threshold: flipped_threshold,
            satisfied,
        }
    }
}

/// Thickness of a strip holding `strip_area` px² laid in `orientation`.
pub fn strip_thickness(strip_area: f64, free: &Region, orientation: StripOrientation) -> f64 {
    let length = orientation.length(free);
    if length > 0.0 {
        (strip_area / length).min(orientation.extent(free))
    } else {
        0.0
    }
}

/// Clamp the thickness factor into (0, 1]; unusable values use the default.
pub fn normalize_factor(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor.min(1.0)
    } else {
        DEFAULT_MIN_THICKNESS_FACTOR
    }
}
