/// Diagnostic tool to verify records → tiles → layout → scheduler pipeline
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use tickermap_rs::fit::RenderProfile;
use tickermap_rs::frame::FrameTile;
use tickermap_rs::layout::{partition_tiles, ConstraintPolicy, LayoutOptions, OrientationPolicy};
use tickermap_rs::scheduler::{RenderScheduler, RenderSurface, SurfaceBox, SurfaceId};
use tickermap_rs::tiles::{self, RawRecord, TimeframeChain};

const SAMPLE: &str = r#"[
    {"symbol": "AAPL", "weight": 3400, "metrics": {"1D": 0.8, "1W": 2.1}, "contentRef": "logos/aapl.svg"},
    {"symbol": "MSFT", "weight": 3100, "metrics": {"1D": -0.4}},
    {"symbol": "NVDA", "weight": 2900, "metrics": {"1D": 3.2}},
    {"symbol": "AMZN", "weight": 1900, "metrics": {"1W": -1.1}},
    {"symbol": "GOOGL", "weight": 1800, "metrics": {"1D": null, "1W": 0.3}},
    {"symbol": "META", "weight": 1300, "metrics": {"1D": 1.7}},
    {"symbol": "TSLA", "weight": 800, "metrics": {"1D": -5.9}},
    {"symbol": "BRK.B", "weight": "n/a", "metrics": {}},
    {"symbol": "AVGO", "weight": 650, "metrics": {"1D": 0.1}},
    {"symbol": "SPY", "weight": 400, "metrics": {"1D": 0.2}}
]"#;

/// Surface that replays a scripted sequence of sizes and counts draws.
struct ScriptedSurface {
    sizes: RefCell<VecDeque<SurfaceBox>>,
    current: Cell<SurfaceBox>,
    draws: Cell<u32>,
}

impl RenderSurface for ScriptedSurface {
    fn id(&self) -> SurfaceId {
        SurfaceId(1)
    }

    fn measure(&self) -> SurfaceBox {
        if let Some(next) = self.sizes.borrow_mut().pop_front() {
            self.current.set(next);
        }
        self.current.get()
    }

    fn install_listeners(&self) {}

    fn request_animation_frame(&self) {}

    fn present(&self, frame: &[FrameTile]) {
        self.draws.set(self.draws.get() + 1);
        println!("    present: {} tiles", frame.len());
    }

    fn clear(&self) {
        println!("    clear");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tickermap_rs=debug".parse()?),
        )
        .init();

    let (width, height) = (960.0, 540.0);

    println!("=== DIAGNOSTIC: Records → Layout Pipeline ===");

    // Records
    let text = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => SAMPLE.to_string(),
    };
    let records: Vec<RawRecord> = tiles::parse_records(&text)?;
    println!("\n[1] Parsed {} records", records.len());

    // Tiles
    let tiles = tiles::normalize(&records);
    let chain = TimeframeChain::standard("1D");
    println!("\n[2] Normalized tiles:");
    for tile in &tiles {
        println!(
            "    '{}' weight={} metric={:?}",
            tile.symbol,
            tile.weight,
            tile.resolve_metric(&chain)
        );
    }

    // Partition under each policy combination
    let priority = tiles.last().map(|t| t.symbol.to_string()).unwrap_or_default();
    let variants = [
        ("row-if-wide / priority-only", OrientationPolicy::RowIfWide, ConstraintPolicy::PriorityOnly),
        ("row-if-wide / constrain-all", OrientationPolicy::RowIfWide, ConstraintPolicy::ConstrainAll),
        ("column-if-short / constrain-all", OrientationPolicy::ColumnIfShort, ConstraintPolicy::ConstrainAll),
    ];

    for (name, orientation, policy) in variants {
        let options = LayoutOptions::default()
            .with_orientation(orientation)
            .with_policy(policy)
            .with_priority([priority.as_str()]);
        let profile = RenderProfile::fallback(options.profile);
        let partition = partition_tiles(&tiles, width, height, &options, &profile);

        println!("\n[3] Partition {name} in {width:.0}x{height:.0}:");
        for (i, strip) in partition.strips.iter().enumerate() {
            println!(
                "    strip {}: {} tiles, base {:?} -> {:?}, thickness {:.1}px (min {:.1}), qualified={} flipped={} satisfied={}",
                i,
                strip.members,
                strip.base,
                strip.decision.orientation,
                strip.decision.thickness,
                strip.decision.threshold,
                strip.decision.qualified,
                strip.decision.flipped,
                strip.decision.satisfied
            );
        }

        // Anomalies: coverage and overlap
        let area_sum: f64 = partition.placements.iter().map(|p| p.rect.area()).sum();
        let mut overlaps = 0usize;
        for (i, a) in partition.placements.iter().enumerate() {
            for b in &partition.placements[i + 1..] {
                if a.rect.intersection_area(&b.rect) > 1e-12 {
                    overlaps += 1;
                }
            }
        }
        println!("    Coverage: {:.6}%", area_sum * 100.0);
        println!("    Overlapping pairs: {}", overlaps);
    }

    // Scheduler replay
    println!("\n[4] Scheduler replay (100x98, 140x140, 140x140):");
    let surface = Rc::new(ScriptedSurface {
        sizes: RefCell::new(
            [(100.0, 98.0), (140.0, 140.0), (140.0, 140.0)]
                .into_iter()
                .map(|(w, h)| SurfaceBox::new(w, h))
                .collect(),
        ),
        current: Cell::new(SurfaceBox::default()),
        draws: Cell::new(0),
    });
    let mut scheduler = RenderScheduler::default();
    scheduler.render(&surface, records, chain, LayoutOptions::default());
    for read in 1..=4 {
        for outcome in scheduler.on_animation_frame() {
            println!("    read {read}: {outcome:?}");
        }
    }
    println!("    Draws: {}", surface.draws.get());

    Ok(())
}
