use crate::fit::RenderProfile;
use crate::layout::{self, LayoutOptions, Region};
use crate::tiles::{self, RawRecord, Tile, TimeframeChain};

/// One tile of a finished frame, ready for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTile {
    pub tile: Tile,
    /// Normalized rect
    pub rect: Region,
    /// Rect in surface pixels
    pub pixels: Region,
    pub scale: f64,
    pub show_text: bool,
    pub show_logo: bool,
    /// Metric resolved along the timeframe chain
    pub metric: Option<f64>,
}

/// Run the whole pipeline for one draw: normalize records, partition, fit
/// content and resolve metrics. Empty input or a zero-size surface yields an
/// empty frame.
pub fn build_frame(
    records: &[RawRecord],
    timeframe: &TimeframeChain,
    width: f64,
    height: f64,
    options: &LayoutOptions,
    profile: &RenderProfile,
) -> Vec<FrameTile> {
    let tiles = tiles::normalize(records);
    let placements = layout::compute_layout_with_profile(&tiles, width, height, options, profile);

    placements
        .into_iter()
        .map(|placement| {
            let tile = &tiles[placement.index];
            FrameTile {
                metric: tile.resolve_metric(timeframe),
                tile: tile.clone(),
                rect: placement.rect,
                pixels: placement.pixels,
                scale: placement.scale,
                show_text: placement.show_text,
                show_logo: placement.show_logo,
            }
        })
        .collect()
}
