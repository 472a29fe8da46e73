use crate::error::AnalyticsError;
use core_types::{AnalyticsResult, ChartConfiguration};
use serde::{Deserialize, Serialize};

/// A finished visual artifact. Its contents are opaque to the analytics core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedChart {
    /// e.g. `application/json`, `image/png`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl RenderedChart {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Draws the series of a result according to a chart configuration.
pub trait ChartRenderer: Send + Sync {
    fn render(
        &self,
        config: &ChartConfiguration,
        result: &AnalyticsResult,
    ) -> Result<RenderedChart, AnalyticsError>;
}

/// Turns a result, and optionally a rendered chart, into a document.
pub trait ReportGenerator: Send + Sync {
    fn generate(
        &self,
        result: &AnalyticsResult,
        chart: Option<&RenderedChart>,
    ) -> Result<String, AnalyticsError>;
}
