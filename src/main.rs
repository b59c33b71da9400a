use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use tickermap_rs::fit::RenderProfile;
use tickermap_rs::frame::build_frame;
use tickermap_rs::layout::LayoutOptions;
use tickermap_rs::tiles::{parse_records, TimeframeChain};

/// Parse "1280x720" style surface sizes.
fn parse_size(text: &str) -> Result<(f64, f64)> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{text}' is not WIDTHxHEIGHT"))?;
    let w: f64 = w.trim().parse().with_context(|| format!("bad width in '{text}'"))?;
    let h: f64 = h.trim().parse().with_context(|| format!("bad height in '{text}'"))?;
    Ok((w, h))
}

fn load_options(path: Option<PathBuf>) -> Result<LayoutOptions> {
    let Some(path) = path else {
        return Ok(LayoutOptions::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading options from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing options in {}", path.display()))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tickermap_rs=info".parse()?),
        )
        .init();

    // Command line: <records.json> [WIDTHxHEIGHT] [timeframe] [options.json]
    let mut args = std::env::args().skip(1);
    let Some(records_path) = args.next().map(PathBuf::from) else {
        bail!("usage: tickermap <records.json> [WIDTHxHEIGHT] [timeframe] [options.json]");
    };
    let (width, height) = match args.next() {
        Some(size) => parse_size(&size)?,
        None => (1280.0, 720.0),
    };
    let timeframe = args.next().unwrap_or_else(|| "1D".to_string());
    let options = load_options(args.next().map(PathBuf::from))?;

    let text = std::fs::read_to_string(&records_path)
        .with_context(|| format!("reading records from {}", records_path.display()))?;
    let records = parse_records(&text)?;

    tracing::info!(
        "Laying out {} records in {:.0}x{:.0} for timeframe {}",
        records.len(),
        width,
        height,
        timeframe
    );

    let frame = build_frame(
        &records,
        &TimeframeChain::standard(&timeframe),
        width,
        height,
        &options,
        &RenderProfile::fallback(options.profile),
    );

    for tile in &frame {
        let metric = tile
            .metric
            .map(|m| format!("{m:+.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<10} {:>8.1} {:>8.1} {:>8.1} {:>8.1}  scale={:.2} text={} logo={} {}",
            tile.tile.symbol,
            tile.pixels.x,
            tile.pixels.y,
            tile.pixels.w,
            tile.pixels.h,
            tile.scale,
            tile.show_text,
            tile.show_logo,
            metric
        );
    }

    Ok(())
}
