use crate::enums::{ChartStyle, InsightType, Severity};
use crate::series::DataSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// A qualitative finding about the shape of one or more series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Names of the series this insight is about.
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl Insight {
    pub fn new(
        insight_type: InsightType,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            title: title.into(),
            description: description.into(),
            severity,
            series: Vec::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn about(mut self, series: impl Into<String>) -> Self {
        self.series.push(series.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// The complete output of one query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub query_description: String,
    pub series: Vec<DataSeries>,
    pub insights: Vec<Insight>,
    pub total_records_analyzed: usize,
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
}

impl AnalyticsResult {
    pub fn new(query_description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            query_description: query_description.into(),
            series: Vec::new(),
            insights: Vec::new(),
            total_records_analyzed: 0,
            execution_time: Duration::ZERO,
        }
    }

    pub fn series_named(&self, name: &str) -> Option<&DataSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn total_points(&self) -> usize {
        self.series.iter().map(DataSeries::len).sum()
    }
}

/// What a chart renderer is asked to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfiguration {
    pub title: String,
    #[serde(default)]
    pub x_axis_label: String,
    #[serde(default)]
    pub y_axis_label: String,
    #[serde(default)]
    pub style: ChartStyle,
    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default = "default_true")]
    pub show_grid: bool,
    /// Names of the result series to draw; empty means all of them.
    #[serde(default)]
    pub series: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl ChartConfiguration {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_axis_label: String::new(),
            y_axis_label: String::new(),
            style: ChartStyle::default(),
            show_legend: true,
            show_grid: true,
            series: Vec::new(),
        }
    }

    /// The result series selected by this configuration, in result order.
    pub fn select<'a>(&self, result: &'a AnalyticsResult) -> Vec<&'a DataSeries> {
        result
            .series
            .iter()
            .filter(|s| self.series.is_empty() || self.series.iter().any(|name| name == &s.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_selection_defaults_to_every_series() {
        let mut result = AnalyticsResult::new("test");
        result.series.push(DataSeries::from_pairs("A", [("x", 1.0)]));
        result.series.push(DataSeries::from_pairs("B", [("x", 2.0)]));

        let mut chart = ChartConfiguration::new("All");
        assert_eq!(chart.select(&result).len(), 2);

        chart.series = vec!["B".to_string()];
        let selected = chart.select(&result);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "B");
    }

    #[test]
    fn result_serializes_execution_time_readably() {
        let mut result = AnalyticsResult::new("test");
        result.execution_time = Duration::from_millis(1500);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["execution_time"], "1s 500ms");
    }
}
