use compact_str::CompactString;

/// Fixed priority order used after the requested timeframe.
pub const DEFAULT_TIMEFRAME_PRIORITY: [&str; 6] = ["1D", "1W", "1M", "3M", "YTD", "1Y"];

/// Ordered list of timeframe keys tried when resolving a tile's metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeframeChain {
    keys: Vec<CompactString>,
}

impl TimeframeChain {
    /// A chain with only the primary key (no fallback).
    pub fn new(primary: &str) -> Self {
        Self {
            keys: vec![CompactString::new(primary)],
        }
    }

    /// Primary key followed by [`DEFAULT_TIMEFRAME_PRIORITY`].
    pub fn standard(primary: &str) -> Self {
        DEFAULT_TIMEFRAME_PRIORITY
            .iter()
            .fold(Self::new(primary), |chain, key| chain.then(key))
    }

    /// Append a fallback key. Keys already in the chain are ignored.
    pub fn then(mut self, key: &str) -> Self {
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(CompactString::new(key));
        }
        self
    }

    pub fn primary(&self) -> Option<&str> {
        self.keys.first().map(|k| k.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.as_str())
    }
}
