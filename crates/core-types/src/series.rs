use crate::enums::{Operation, SeriesType};
use crate::statistics::DataStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_SERIES_COLOR: &str = "#1f77b4";

/// A single labelled observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl DataPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            timestamp: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An ordered collection of observations. Insertion order is domain order
/// (time, category, or whatever the source query sorted by).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
    pub series_type: SeriesType,
    /// The catalog field this series was read from, empty for derived series.
    #[serde(default)]
    pub source_field: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl DataSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            color: DEFAULT_SERIES_COLOR.to_string(),
            series_type: SeriesType::default(),
            source_field: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_source_field(mut self, field: impl Into<String>) -> Self {
        self.source_field = field.into();
        self
    }

    pub fn with_type(mut self, series_type: SeriesType) -> Self {
        self.series_type = series_type;
        self
    }

    pub fn with_points(mut self, points: Vec<DataPoint>) -> Self {
        self.points = points;
        self
    }

    /// Convenience for building a series from bare `(label, value)` pairs.
    pub fn from_pairs<L: Into<String>>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (L, f64)>,
    ) -> Self {
        let points = pairs
            .into_iter()
            .map(|(label, value)| DataPoint::new(label, value))
            .collect();
        Self::new(name).with_points(points)
    }

    /// Starts a derived series that keeps this series' presentation settings.
    pub fn derive(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            color: self.color.clone(),
            series_type: self.series_type,
            source_field: self.source_field.clone(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Statistics over the full point set, computed fresh on every call.
    pub fn statistics(&self) -> DataStatistics {
        DataStatistics::from_values(&self.values())
    }

    /// Applies `op` with `operand` to every point in place.
    pub fn apply_operation(&mut self, op: Operation, operand: f64) {
        let f = op.function();
        for point in &mut self.points {
            point.value = f(point.value, operand);
        }
    }
}
