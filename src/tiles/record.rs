use std::collections::HashMap;

use compact_str::CompactString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Opaque handle to a logo/image, resolved by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(pub CompactString);

/// One record as supplied by the market-data collaborator, before normalization.
///
/// Deserialization never rejects a record over a bad field: weights and
/// metrics that are not numbers (or numeric strings) become missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub symbol: CompactString,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub label: Option<CompactString>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metrics")]
    pub metrics: HashMap<CompactString, Option<f64>>,
    #[serde(default, deserialize_with = "lenient_content_ref")]
    pub content_ref: Option<ContentRef>,
}

impl RawRecord {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(CompactString::new(label));
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set (or clear, with `None`) the metric for a timeframe key.
    pub fn with_metric(mut self, timeframe: &str, value: Option<f64>) -> Self {
        self.metrics.insert(CompactString::new(timeframe), value);
        self
    }

    pub fn with_content_ref(mut self, handle: &str) -> Self {
        self.content_ref = Some(ContentRef(CompactString::new(handle)));
        self
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text_from_value(value: &Value) -> Option<CompactString> {
    match value {
        Value::String(s) => Some(CompactString::new(s.trim())),
        Value::Number(n) => Some(CompactString::new(n.to_string())),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<CompactString, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from_value(&value).unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<CompactString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from_value(&value).filter(|s| !s.is_empty()))
}

fn lenient_content_ref<'de, D>(deserializer: D) -> Result<Option<ContentRef>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_text(deserializer).map(|text| text.map(ContentRef))
}

fn lenient_metrics<'de, D>(deserializer: D) -> Result<HashMap<CompactString, Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(entries) = value else {
        return Ok(HashMap::new());
    };
    Ok(entries
        .iter()
        .map(|(key, v)| (CompactString::new(key), number_from_value(v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_fields_become_missing() {
        let record: RawRecord = serde_json::from_str(
            r#"{"symbol":"AAPL","weight":"n/a","metrics":{"1D":"1.5","1W":null,"1M":[1]},"contentRef":7}"#,
        )
        .unwrap();
        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.weight, None);
        assert_eq!(record.metrics.get("1D"), Some(&Some(1.5)));
        assert_eq!(record.metrics.get("1W"), Some(&None));
        assert_eq!(record.metrics.get("1M"), Some(&None));
        assert_eq!(record.content_ref, Some(ContentRef(CompactString::new("7"))));
    }

    #[test]
    fn missing_fields_default() {
        let record: RawRecord = serde_json::from_str(r#"{"metrics":[]}"#).unwrap();
        assert!(record.symbol.is_empty());
        assert!(record.label.is_none());
        assert!(record.metrics.is_empty());
        assert!(record.content_ref.is_none());
    }
}
