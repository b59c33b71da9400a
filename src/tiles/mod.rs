pub mod record;
pub mod timeframe;

use std::collections::HashMap;

use anyhow::{Context, Result};
use compact_str::{format_compact, CompactString};
use serde::Deserialize;

pub use self::record::{ContentRef, RawRecord};
pub use self::timeframe::{TimeframeChain, DEFAULT_TIMEFRAME_PRIORITY};

/// A normalized, weighted unit of the treemap.
///
/// Tiles are rebuilt on every layout call; nothing about them is remembered
/// between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Instrument identifier, never empty
    pub symbol: CompactString,
    /// Optional display name
    pub label: Option<CompactString>,
    /// Strictly positive, finite weight (area share)
    pub weight: f64,
    /// Percent-change metrics by timeframe key (`None` = explicitly absent)
    pub metrics: HashMap<CompactString, Option<f64>>,
    /// Optional logo handle
    pub content_ref: Option<ContentRef>,
}

impl Tile {
    /// Build a tile directly; `weight` goes through [`normalize_weight`].
    pub fn new(symbol: &str, weight: f64) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            label: None,
            weight: normalize_weight(Some(weight)),
            metrics: HashMap::new(),
            content_ref: None,
        }
    }

    pub fn with_metric(mut self, timeframe: &str, value: Option<f64>) -> Self {
        self.metrics.insert(CompactString::new(timeframe), value);
        self
    }

    pub fn with_content_ref(mut self, handle: &str) -> Self {
        self.content_ref = Some(ContentRef(CompactString::new(handle)));
        self
    }

    /// First finite metric along the chain, or `None` when nothing resolves.
    pub fn resolve_metric(&self, chain: &TimeframeChain) -> Option<f64> {
        chain
            .keys()
            .filter_map(|key| self.metrics.get(key).copied().flatten())
            .find(|value| value.is_finite())
    }

    pub fn has_logo(&self) -> bool {
        self.content_ref.is_some()
    }

    /// Label if present, otherwise the symbol.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(self.symbol.as_str())
    }
}

/// Coerce a source weight: missing, NaN, infinite or non-positive becomes 1.
pub fn normalize_weight(weight: Option<f64>) -> f64 {
    match weight {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => 1.0,
    }
}

/// Normalize raw records into tiles. Every record yields exactly one tile,
/// in input order.
pub fn normalize(records: &[RawRecord]) -> Vec<Tile> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record))
        .collect()
}

fn normalize_record(index: usize, record: &RawRecord) -> Tile {
    let symbol = if !record.symbol.trim().is_empty() {
        CompactString::new(record.symbol.trim())
    } else if let Some(label) = record.label.as_ref().filter(|l| !l.trim().is_empty()) {
        CompactString::new(label.trim())
    } else {
        format_compact!("#{index}")
    };

    if record.weight != Some(normalize_weight(record.weight)) {
        tracing::trace!(
            "Record {} ('{}') has unusable weight {:?}, using 1",
            index,
            symbol,
            record.weight
        );
    }

    Tile {
        symbol,
        label: record.label.clone(),
        weight: normalize_weight(record.weight),
        metrics: record.metrics.clone(),
        content_ref: record.content_ref.clone(),
    }
}

/// Parse a JSON array of records. Individual fields are read leniently; only
/// a document that is not an array of objects is rejected.
pub fn parse_records(json: &str) -> Result<Vec<RawRecord>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(json).context("records document is not a JSON array")?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            RawRecord::deserialize(value).with_context(|| format!("record {index} is not an object"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_weights_fall_back_to_one() {
        let records = vec![
            RawRecord::new("A"),
            RawRecord::new("B").with_weight(f64::NAN),
            RawRecord::new("C").with_weight(-3.0),
            RawRecord::new("D").with_weight(0.0),
            RawRecord::new("E").with_weight(f64::INFINITY),
            RawRecord::new("F").with_weight(42.5),
        ];
        let tiles = normalize(&records);
        let weights: Vec<f64> = tiles.iter().map(|t| t.weight).collect();
        assert_eq!(weights, vec![1.0, 1.0, 1.0, 1.0, 1.0, 42.5]);
    }

    #[test]
    fn every_record_yields_a_tile() {
        let records = vec![
            RawRecord::default(),
            RawRecord::default().with_label("Bitcoin"),
            RawRecord::new("  MSFT "),
        ];
        let tiles = normalize(&records);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].symbol, "#0");
        assert_eq!(tiles[1].symbol, "Bitcoin");
        assert_eq!(tiles[2].symbol, "MSFT");
    }

    #[test]
    fn metric_follows_fallback_chain() {
        let tile = Tile::new("NVDA", 10.0)
            .with_metric("1D", None)
            .with_metric("1W", Some(f64::NAN))
            .with_metric("1M", Some(4.2));

        assert_eq!(tile.resolve_metric(&TimeframeChain::new("1D")), None);
        assert_eq!(
            tile.resolve_metric(&TimeframeChain::new("1D").then("1W").then("1M")),
            Some(4.2)
        );
        assert_eq!(tile.resolve_metric(&TimeframeChain::standard("YTD")), Some(4.2));
        assert_eq!(tile.resolve_metric(&TimeframeChain::default()), None);
    }

    #[test]
    fn parse_records_rejects_non_arrays_only() {
        assert!(parse_records(r#"{"symbol":"A"}"#).is_err());
        assert!(parse_records(r#"[{"symbol":"A"}, 3]"#).is_err());

        let records = parse_records(r#"[{"symbol":"A","weight":2},{"symbol":"B","weight":false}]"#)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].weight, None);
    }
}
