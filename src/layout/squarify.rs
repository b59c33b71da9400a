use super::governor::{ConstraintGovernor, StripDecision};
use super::{OrientationPolicy, Region, StripOrientation};
use crate::tiles::Tile;

/// One tile's slot in the partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Index into the input tile slice
    pub index: usize,
    /// Rect in surface pixels
    pub pixels: Region,
    /// Rect normalized to the container (0..=1 on both axes)
    pub rect: Region,
}

/// What happened to one committed strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripReport {
    pub members: usize,
    pub base: StripOrientation,
    pub decision: StripDecision,
}

/// Result of partitioning a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Pinned tile first (if any), then strips in commit order
    pub placements: Vec<Placement>,
    pub strips: Vec<StripReport>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Squarified partition of a `width` x `height` container.
///
/// Tiles are taken in descending weight order (stable). Each strip is grown
/// greedily while its worst aspect ratio does not get worse, reviewed by the
/// governor, then committed against the free region. The last strip takes
/// whatever is left, so the placements tile the container exactly.
pub fn partition(
    tiles: &[Tile],
    width: f64,
    height: f64,
    pinned_top: Option<&str>,
    orientation: OrientationPolicy,
    governor: &ConstraintGovernor,
) -> Partition {
    let mut result = Partition::default();
    if tiles.is_empty() || !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0
    {
        return result;
    }

    // Shares are taken relative to the heaviest tile so the sum stays finite
    // for any positive, finite weights
    let max_weight = tiles.iter().map(|t| t.weight).fold(0.0, f64::max);
    let relative: Vec<f64> = tiles.iter().map(|t| t.weight / max_weight).collect();
    let total_relative: f64 = relative.iter().sum();
    let total_area = width * height;
    let tile_area: Vec<f64> = relative
        .iter()
        .map(|&r| (r / total_relative) * total_area)
        .collect();

    // Sort by weight descending (stable, so equal weights keep input order)
    let mut order: Vec<usize> = (0..tiles.len()).collect();
    order.sort_by(|&a, &b| tiles[b].weight.total_cmp(&tiles[a].weight));

    let mut free = Region {
        x: 0.0,
        y: 0.0,
        w: width,
        h: height,
    };
    let mut pixels: Vec<(usize, Region)> = Vec::with_capacity(tiles.len());

    if let Some(symbol) = pinned_top {
        if let Some(pos) = order.iter().position(|&i| tiles[i].symbol == symbol) {
            let index = order.remove(pos);
            let h = if order.is_empty() {
                free.h
            } else {
                (tile_area[index] / free.w).min(free.h)
            };
            pixels.push((
                index,
                Region {
                    x: free.x,
                    y: free.y,
                    w: free.w,
                    h,
                },
            ));
            free.y += h;
            free.h = (free.h - h).max(0.0);
        }
    }

    let areas: Vec<f64> = order.iter().map(|&i| tile_area[i]).collect();

    let mut start = 0;
    while start < order.len() {
        // Guard against degenerate cases
        if free.w <= 0.0 || free.h <= 0.0 {
            tracing::warn!(
                "Squarify: free region collapsed ({}x{}) with {} tiles left, emitting empty rects",
                free.w,
                free.h,
                order.len() - start
            );
            for &index in &order[start..] {
                pixels.push((
                    index,
                    Region {
                        x: free.x,
                        y: free.y,
                        w: 0.0,
                        h: 0.0,
                    },
                ));
            }
            break;
        }

        let base = orientation.base(free.w, free.h);
        let end = grow_strip(&areas, start, base.length(&free));

        let members: Vec<&Tile> = order[start..end].iter().map(|&i| &tiles[i]).collect();
        let strip_area: f64 = areas[start..end].iter().sum();
        let is_last = end == order.len();
        let decision = governor.review(&members, strip_area, &free, base, is_last);

        let thickness = commit_strip(
            &mut free,
            decision.orientation,
            &order[start..end],
            &areas[start..end],
            is_last,
            &mut pixels,
        );

        tracing::trace!(
            "Committed {:?} strip of {} (thickness {:.2}px, last={})",
            decision.orientation,
            end - start,
            thickness,
            is_last
        );

        result.strips.push(StripReport {
            members: end - start,
            base,
            decision,
        });
        start = end;
    }

    result.placements = pixels
        .into_iter()
        .map(|(index, px)| Placement {
            index,
            pixels: px,
            rect: px.normalized(width, height),
        })
        .collect();
    result
}

/// Extend the strip starting at `start` while the worst aspect ratio does not
/// increase. Returns the exclusive end index.
fn grow_strip(areas: &[f64], start: usize, side: f64) -> usize {
    let mut end = start + 1;
    let mut sum = areas[start];
    let mut worst = worst_aspect_ratio(&areas[start..end], sum, side);

    while end < areas.len() {
        let candidate_sum = sum + areas[end];
        let candidate = worst_aspect_ratio(&areas[start..=end], candidate_sum, side);
        if candidate > worst {
            break;
        }
        worst = candidate;
        sum = candidate_sum;
        end += 1;
    }

    end
}

/// Lay the strip members consecutively along the strip and shrink the free
/// region by the strip's thickness. Returns that thickness.
fn commit_strip(
    free: &mut Region,
    orientation: StripOrientation,
    members: &[usize],
    areas: &[f64],
    is_last: bool,
    out: &mut Vec<(usize, Region)>,
) -> f64 {
    let length = orientation.length(free);
    let extent = orientation.extent(free);
    let sum: f64 = areas.iter().sum();

    // The final strip absorbs all remaining space
    let thickness = if is_last {
        extent
    } else {
        (sum / length).min(extent)
    };

    let mut offset = 0.0;
    for (k, (&index, &area)) in members.iter().zip(areas).enumerate() {
        // Last member takes the rounding remainder so no gap appears
        let span = if k + 1 == members.len() {
            (length - offset).max(0.0)
        } else if thickness > 0.0 {
            area / thickness
        } else {
            0.0
        };

        let region = match orientation {
            StripOrientation::Row => Region {
                x: free.x,
                y: free.y + offset,
                w: thickness,
                h: span,
            },
            StripOrientation::Column => Region {
                x: free.x + offset,
                y: free.y,
                w: span,
                h: thickness,
            },
        };
        out.push((index, region));
        offset += span;
    }

    match orientation {
        StripOrientation::Row => {
            free.x += thickness;
            free.w = (free.w - thickness).max(0.0);
        }
        StripOrientation::Column => {
            free.y += thickness;
            free.h = (free.h - thickness).max(0.0);
        }
    }

    thickness
}

/// Worst aspect ratio of a strip: `max(side²·max/sum², sum²/(side²·min))`.
pub fn worst_aspect_ratio(row: &[f64], sum: f64, side: f64) -> f64 {
    if row.is_empty() || sum <= 0.0 || side <= 0.0 {
        return f64::MAX;
    }
    let side_sq = side * side;
    let sum_sq = sum * sum;
    let max_r = row.iter().copied().fold(0.0, f64::max);
    let min_r = row.iter().copied().fold(f64::INFINITY, f64::min);
    let a = (side_sq * max_r) / sum_sq;
    let b = sum_sq / (side_sq * min_r);
    a.max(b)
}
