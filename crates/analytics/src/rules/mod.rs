use core_types::{DataSeries, DataStatistics, Insight};

pub mod anomaly;
pub mod correlation;
pub mod threshold;
pub mod trend;

pub use anomaly::AnomalyRule;
pub use correlation::CorrelationRule;
pub use threshold::ThresholdRule;
pub use trend::TrendRule;

/// A series paired with statistics computed once for all rules.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzedSeries<'a> {
    pub series: &'a DataSeries,
    pub stats: DataStatistics,
}

impl<'a> AnalyzedSeries<'a> {
    pub fn new(series: &'a DataSeries) -> Self {
        Self {
            series,
            stats: series.statistics(),
        }
    }
}

/// The contract every insight detector implements.
///
/// A rule sees every series of a result at once so cross-series rules
/// (correlation) fit the same shape as per-series rules. Rules must not fail:
/// series they cannot evaluate are skipped.
pub trait InsightRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the insights found, in series iteration order.
    fn evaluate(&self, series: &[AnalyzedSeries<'_>]) -> Vec<Insight>;
}

/// Rounds for display in insight descriptions.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
